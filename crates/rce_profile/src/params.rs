//! Estimator parameters.
//!
//! The estimator is driven by a fully typed parameter set. [`EnergyProfileParameters::default`]
//! carries the values calibrated against a Kuka KR16R2010 in Process Simulate;
//! callers override parts of it through [`PartialEnergyProfileParameters`],
//! usually loaded from TOML, and [`EnergyProfileParameters::merged`] fills
//! every missing field from the defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Coefficients of a quadratic `A*x^2 + B*x + C`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadCoefs {
    #[serde(rename = "A")]
    pub a: f64,
    #[serde(rename = "B")]
    pub b: f64,
    #[serde(rename = "C")]
    pub c: f64,
}

impl QuadCoefs {
    #[must_use]
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn eval(self, x: f64) -> f64 {
        self.a * x * x + self.b * x + self.c
    }
}

/// One value per movement direction component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerDirection<T> {
    pub side: T,
    pub into_dist: T,
    pub from_afar: T,
    pub up: T,
    pub down: T,
}

impl<T: Copy> PerDirection<T> {
    fn merged(partial: Option<PartialPerDirection<T>>, default: Self) -> Self {
        let Some(partial) = partial else {
            return default;
        };
        Self {
            side: partial.side.unwrap_or(default.side),
            into_dist: partial.into_dist.unwrap_or(default.into_dist),
            from_afar: partial.from_afar.unwrap_or(default.from_afar),
            up: partial.up.unwrap_or(default.up),
            down: partial.down.unwrap_or(default.down),
        }
    }
}

/// Scalars mapping physical masses to dimensionless factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommonParams {
    pub robot_weight_coef: f64,
    pub payload_weight_coef: f64,
}

/// Idle power rate model: `base * dist_coef(d) * height_coef(h)` with `d`
/// the horizontal distance from the robot axis and `h` the hold height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdlingParams {
    pub base: f64,
    pub dist_coef: QuadCoefs,
    pub height_coef: QuadCoefs,
}

/// Movement energy model for one duration regime: a product of a base
/// factor and direction-weighted type, length, average-distance and
/// average-height factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeParams {
    pub base: f64,
    pub type_factor: PerDirection<f64>,
    pub length_coef: PerDirection<QuadCoefs>,
    pub avg_dist_coef: PerDirection<QuadCoefs>,
    pub avg_height_coef: PerDirection<QuadCoefs>,
}

/// The optimal-duration regime carries the regime factors (they produce the
/// opt-duration ratio, not an energy) plus the placement of the flat floor
/// of the V-shaped envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptDurationParams {
    #[serde(flatten)]
    pub regime: RegimeParams,
    /// Shift of the floor's left corner, `left_dur_shift * opt_dur`, in (0, 1).
    pub left_dur_shift: f64,
    /// Floor of the left corner, `min_left_dur_ratio * min_dur`, >= 1.
    pub min_left_dur_ratio: f64,
    /// Shift of the floor's right corner, `right_dur_shift * opt_dur`, >= 1.
    pub right_dur_shift: f64,
    /// Floor of the right corner, `min_right_dur_ratio * min_dur`, >= 1.
    pub min_right_dur_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementParams {
    pub min_duration: RegimeParams,
    pub max_duration: RegimeParams,
    pub opt_duration: OptDurationParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyProfileParameters {
    pub common: CommonParams,
    pub idling: IdlingParams,
    pub movement: MovementParams,
}

impl EnergyProfileParameters {
    /// Fills every field the partial set leaves out from the defaults.
    #[must_use]
    pub fn merged(partial: PartialEnergyProfileParameters) -> Self {
        let defaults = Self::default();
        let common = partial.common.unwrap_or_default();
        let idling = partial.idling.unwrap_or_default();
        let movement = partial.movement.unwrap_or_default();
        let opt = movement.opt_duration.unwrap_or_default();

        Self {
            common: CommonParams {
                robot_weight_coef: common
                    .robot_weight_coef
                    .unwrap_or(defaults.common.robot_weight_coef),
                payload_weight_coef: common
                    .payload_weight_coef
                    .unwrap_or(defaults.common.payload_weight_coef),
            },
            idling: IdlingParams {
                base: idling.base.unwrap_or(defaults.idling.base),
                dist_coef: idling.dist_coef.unwrap_or(defaults.idling.dist_coef),
                height_coef: idling.height_coef.unwrap_or(defaults.idling.height_coef),
            },
            movement: MovementParams {
                min_duration: RegimeParams::merged(
                    movement.min_duration,
                    defaults.movement.min_duration,
                ),
                max_duration: RegimeParams::merged(
                    movement.max_duration,
                    defaults.movement.max_duration,
                ),
                opt_duration: OptDurationParams {
                    regime: RegimeParams::merged(
                        Some(opt.regime),
                        defaults.movement.opt_duration.regime,
                    ),
                    left_dur_shift: opt
                        .left_dur_shift
                        .unwrap_or(defaults.movement.opt_duration.left_dur_shift),
                    min_left_dur_ratio: opt
                        .min_left_dur_ratio
                        .unwrap_or(defaults.movement.opt_duration.min_left_dur_ratio),
                    right_dur_shift: opt
                        .right_dur_shift
                        .unwrap_or(defaults.movement.opt_duration.right_dur_shift),
                    min_right_dur_ratio: opt
                        .min_right_dur_ratio
                        .unwrap_or(defaults.movement.opt_duration.min_right_dur_ratio),
                },
            },
        }
    }

    /// Parses a (possibly partial) parameter set from TOML and merges it
    /// with the defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ParseError> {
        let partial: PartialEnergyProfileParameters = toml::from_str(source)?;
        Ok(Self::merged(partial))
    }

    /// Reads a (possibly partial) parameter set from a TOML file.
    pub fn from_toml_path(path: &std::path::Path) -> Result<Self, ParseError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

impl RegimeParams {
    fn merged(partial: Option<PartialRegimeParams>, default: Self) -> Self {
        let Some(partial) = partial else {
            return default;
        };
        Self {
            base: partial.base.unwrap_or(default.base),
            type_factor: PerDirection::merged(partial.type_factor, default.type_factor),
            length_coef: PerDirection::merged(partial.length_coef, default.length_coef),
            avg_dist_coef: PerDirection::merged(partial.avg_dist_coef, default.avg_dist_coef),
            avg_height_coef: PerDirection::merged(partial.avg_height_coef, default.avg_height_coef),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialPerDirection<T> {
    pub side: Option<T>,
    pub into_dist: Option<T>,
    pub from_afar: Option<T>,
    pub up: Option<T>,
    pub down: Option<T>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialCommonParams {
    pub robot_weight_coef: Option<f64>,
    pub payload_weight_coef: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialIdlingParams {
    pub base: Option<f64>,
    pub dist_coef: Option<QuadCoefs>,
    pub height_coef: Option<QuadCoefs>,
}

// no deny_unknown_fields here: this struct is flattened into the opt
// regime, and serde routes the outer keys through it
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PartialRegimeParams {
    pub base: Option<f64>,
    pub type_factor: Option<PartialPerDirection<f64>>,
    pub length_coef: Option<PartialPerDirection<QuadCoefs>>,
    pub avg_dist_coef: Option<PartialPerDirection<QuadCoefs>>,
    pub avg_height_coef: Option<PartialPerDirection<QuadCoefs>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PartialOptDurationParams {
    #[serde(flatten)]
    pub regime: PartialRegimeParams,
    pub left_dur_shift: Option<f64>,
    pub min_left_dur_ratio: Option<f64>,
    pub right_dur_shift: Option<f64>,
    pub min_right_dur_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialMovementParams {
    pub min_duration: Option<PartialRegimeParams>,
    pub max_duration: Option<PartialRegimeParams>,
    pub opt_duration: Option<PartialOptDurationParams>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialEnergyProfileParameters {
    pub common: Option<PartialCommonParams>,
    pub idling: Option<PartialIdlingParams>,
    pub movement: Option<PartialMovementParams>,
}

impl Default for EnergyProfileParameters {
    /// Parameter values fitted on a Kuka KR16R2010 in Process Simulate.
    /// Idling coefficients minimize the maximum error, movement
    /// coefficients the sum of squared relative errors.
    fn default() -> Self {
        Self {
            common: CommonParams {
                robot_weight_coef: 1.0 / 300.0,
                payload_weight_coef: 1.0 / 100.0,
            },
            idling: IdlingParams {
                base: 459.467,
                dist_coef: QuadCoefs::new(
                    0.000_000_049_849_559_635_426_8,
                    -0.000_057_276_721_487_869_8,
                    0.967_112_983_697_484,
                ),
                height_coef: QuadCoefs::new(
                    0.000_000_010_127_398_024_363_4,
                    -0.000_014_521_680_295_617_4,
                    1.026_320_673_899_33,
                ),
            },
            movement: MovementParams {
                min_duration: RegimeParams {
                    base: 173.933_940_170_940_02,
                    type_factor: PerDirection {
                        side: 0.830_459_281_505_365_4,
                        into_dist: 0.752_344_060_438_733_4,
                        from_afar: 0.721_736_197_499_155_1,
                        up: 0.557_046_676_240_107_2,
                        down: 0.688_599_343_364_947_2,
                    },
                    length_coef: PerDirection {
                        side: QuadCoefs::new(
                            -2.964_205_853_915_717_5e-6,
                            0.005_170_183_259_193_887,
                            -0.603_935_557_535_278_1,
                        ),
                        into_dist: QuadCoefs::new(
                            -1.214_725_919_196_327_3e-6,
                            0.002_729_875_518_059_903_2,
                            0.007_727_839_372_655_851,
                        ),
                        from_afar: QuadCoefs::new(
                            -5.290_186_194_420_041e-7,
                            0.001_944_365_682_727_030_3,
                            0.170_769_619_571_501_6,
                        ),
                        up: QuadCoefs::new(
                            -1.281_244_660_636_052_8e-6,
                            0.003_280_825_086_579_991,
                            -0.225_313_575_958_319_52,
                        ),
                        down: QuadCoefs::new(
                            -1.507_582_502_014_737_8e-6,
                            0.003_777_780_045_075_860_3,
                            -0.381_724_109_964_263_6,
                        ),
                    },
                    avg_dist_coef: PerDirection {
                        side: QuadCoefs::new(
                            -4.467_752_888_767_398_6e-7,
                            0.000_848_039_857_378_65,
                            0.674_735_227_959_205_3,
                        ),
                        into_dist: QuadCoefs::new(
                            -9.768_530_016_563_226e-7,
                            0.002_095_578_903_308_267,
                            0.0,
                        ),
                        from_afar: QuadCoefs::new(
                            -8.423_119_029_821_208e-7,
                            0.001_908_968_212_651_307_8,
                            0.0,
                        ),
                        up: QuadCoefs::new(
                            9.774_488_857_407_347e-7,
                            -0.002_896_761_867_981_177_7,
                            2.825_937_207_946_747,
                        ),
                        down: QuadCoefs::new(
                            7.859_703_351_674_412e-7,
                            -0.002_309_844_513_382_708,
                            2.437_003_464_512_027,
                        ),
                    },
                    avg_height_coef: PerDirection {
                        side: QuadCoefs::new(
                            9.157_644_771_760_709e-7,
                            -0.001_383_189_952_478_878_7,
                            1.331_624_008_093_461_8,
                        ),
                        into_dist: QuadCoefs::new(
                            -1.112_227_825_755_842_2e-6,
                            0.002_429_309_860_698_391_6,
                            0.422_799_122_464_843_75,
                        ),
                        from_afar: QuadCoefs::new(
                            -2.143_911_840_107_297_6e-6,
                            0.003_317_773_991_711_929,
                            0.411_227_504_306_820_26,
                        ),
                        up: QuadCoefs::new(
                            -1.986_838_651_944_828_3e-6,
                            0.001_059_848_112_507_950_2,
                            1.414_988_280_830_603_4,
                        ),
                        down: QuadCoefs::new(
                            -2.388_591_985_841_049_4e-6,
                            0.001_314_890_467_371_054_8,
                            1.500_622_799_542_852_3,
                        ),
                    },
                },
                max_duration: RegimeParams {
                    base: 768.619_675_213_675_6,
                    type_factor: PerDirection {
                        side: 0.637_523_456_941_924_4,
                        into_dist: 1.097_343_111_131_401_6,
                        from_afar: 1.042_682_274_430_861,
                        up: 0.784_107_439_709_869_6,
                        down: 0.622_330_009_567_417_4,
                    },
                    length_coef: PerDirection {
                        side: QuadCoefs::new(
                            -3.116_750_156_582_37e-7,
                            0.002_278_554_255_236_644,
                            -0.041_156_290_346_181_595,
                        ),
                        into_dist: QuadCoefs::new(
                            -1.255_031_283_496_886_6e-6,
                            0.002_992_167_694_936_335,
                            -0.102_804_397_266_463_32,
                        ),
                        from_afar: QuadCoefs::new(
                            3.812_759_986_726_785_5e-7,
                            0.001_123_821_524_532_637_7,
                            0.286_579_983_389_349_6,
                        ),
                        up: QuadCoefs::new(
                            -2.704_672_532_260_090_4e-7,
                            0.001_955_782_446_896_298_3,
                            0.090_576_902_497_500_28,
                        ),
                        down: QuadCoefs::new(
                            -9.076_626_925_722_06e-7,
                            0.002_841_784_522_786_680_2,
                            -0.131_550_748_621_117_15,
                        ),
                    },
                    avg_dist_coef: PerDirection {
                        side: QuadCoefs::new(
                            1.141_383_631_365_071_2e-6,
                            -0.003_660_284_444_785_865_5,
                            3.469_163_609_554_389_6,
                        ),
                        into_dist: QuadCoefs::new(
                            -5.308_328_528_617_122e-7,
                            0.001_480_393_180_883_160_4,
                            0.0,
                        ),
                        from_afar: QuadCoefs::new(
                            -3.193_543_559_285_923_5e-7,
                            0.001_192_489_050_926_028_3,
                            0.0,
                        ),
                        up: QuadCoefs::new(
                            -7.080_543_559_930_304e-7,
                            0.000_767_019_138_138_974_7,
                            1.101_454_516_450_092_4,
                        ),
                        down: QuadCoefs::new(
                            -8.389_020_720_580_897e-7,
                            0.000_613_656_065_842_314_3,
                            1.475_588_484_153_555_6,
                        ),
                    },
                    avg_height_coef: PerDirection {
                        side: QuadCoefs::new(
                            -1.936_307_710_501_539_2e-7,
                            0.000_334_846_865_696_861_2,
                            0.915_228_981_222_345_9,
                        ),
                        into_dist: QuadCoefs::new(
                            1.469_586_084_501_646_2e-6,
                            -0.002_148_047_666_958_487_7,
                            1.507_208_026_480_468_6,
                        ),
                        from_afar: QuadCoefs::new(
                            1.619_231_607_733_128e-6,
                            -0.002_418_366_699_529_617_7,
                            1.593_852_233_315_769_2,
                        ),
                        up: QuadCoefs::new(
                            3.222_783_126_008_526_5e-6,
                            -0.003_842_396_486_083_208,
                            1.678_307_485_220_305,
                        ),
                        down: QuadCoefs::new(
                            3.428_474_096_905_609_4e-6,
                            -0.003_687_153_062_740_241_7,
                            1.513_219_056_213_842_6,
                        ),
                    },
                },
                opt_duration: OptDurationParams {
                    regime: RegimeParams {
                        base: 1.321_307_692_307_692_3,
                        type_factor: PerDirection {
                            side: 0.979_406_683_875_748_6,
                            into_dist: 1.025_717_677_440_512_1,
                            from_afar: 1.014_094_399_040_341,
                            up: 0.971_528_311_064_773_3,
                            down: 1.029_915_166_334_343_8,
                        },
                        length_coef: PerDirection {
                            side: QuadCoefs::new(
                                -2.519_723_762_568_115e-7,
                                0.000_545_846_683_610_287_5,
                                0.794_331_221_633_169_6,
                            ),
                            into_dist: QuadCoefs::new(
                                -1.507_681_334_060_624e-7,
                                0.000_278_004_776_377_200_4,
                                0.904_175_873_621_197_1,
                            ),
                            from_afar: QuadCoefs::new(
                                -1.387_675_521_262_773_2e-7,
                                0.000_424_734_021_390_029_2,
                                0.815_903_296_936_723_4,
                            ),
                            up: QuadCoefs::new(
                                -4.238_028_067_001_805_5e-7,
                                0.000_781_890_383_408_058_7,
                                0.732_384_397_288_971_2,
                            ),
                            down: QuadCoefs::new(
                                -5.604_350_867_612_998e-7,
                                0.000_855_553_549_367_791_7,
                                0.747_563_911_446_786_6,
                            ),
                        },
                        avg_dist_coef: PerDirection {
                            side: QuadCoefs::new(
                                5.141_324_772_809_143_6e-9,
                                -0.000_083_781_280_267_066_76,
                                1.078_233_036_772_544_1,
                            ),
                            into_dist: QuadCoefs::new(
                                -6.383_979_642_039_558e-7,
                                0.001_627_818_373_982_291_8,
                                0.0,
                            ),
                            from_afar: QuadCoefs::new(
                                -6.685_443_507_454_593e-7,
                                0.001_669_248_575_207_737_5,
                                0.0,
                            ),
                            up: QuadCoefs::new(
                                7.291_379_613_207_92e-8,
                                -0.000_290_997_767_181_302_24,
                                1.207_703_632_935_226_4,
                            ),
                            down: QuadCoefs::new(
                                7.659_466_871_910_321e-8,
                                -0.000_307_781_410_272_866_16,
                                1.220_428_061_240_756_5,
                            ),
                        },
                        avg_height_coef: PerDirection {
                            side: QuadCoefs::new(
                                1.435_976_133_177_749_8e-7,
                                -0.000_215_396_419_976_662_5,
                                1.048_429_522_641_292_5,
                            ),
                            into_dist: QuadCoefs::new(
                                -8.334_310_472_905_604e-8,
                                0.000_172_205_620_367_321_35,
                                0.949_338_676_383_949_9,
                            ),
                            from_afar: QuadCoefs::new(
                                -2.635_743_371_189_274_3e-7,
                                0.000_283_568_982_408_813_15,
                                0.968_548_307_187_187_7,
                            ),
                            up: QuadCoefs::new(
                                -1.359_720_726_517_706e-7,
                                0.000_043_268_678_026_634_254,
                                1.035_880_489_337_657,
                            ),
                            down: QuadCoefs::new(
                                -8.363_173_067_012_508e-8,
                                0.000_025_691_927_117_600_266,
                                1.022_332_586_367_573_8,
                            ),
                        },
                    },
                    left_dur_shift: 0.9,
                    min_left_dur_ratio: 1.1,
                    right_dur_shift: 1.1,
                    min_right_dur_ratio: 1.3,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn quad_eval() {
        let quad = QuadCoefs::new(2.0, -1.0, 3.0);
        assert_abs_diff_eq!(quad.eval(0.0), 3.0);
        assert_abs_diff_eq!(quad.eval(2.0), 9.0);
    }

    #[test]
    fn empty_partial_merges_to_defaults() {
        let merged = EnergyProfileParameters::merged(PartialEnergyProfileParameters::default());
        assert_eq!(merged, EnergyProfileParameters::default());
    }

    #[test]
    fn toml_override_keeps_other_defaults() {
        let params = EnergyProfileParameters::from_toml_str(
            r#"
            [idling]
            base = 100.0

            [movement.opt_duration]
            right_dur_shift = 1.5
            "#,
        )
        .expect("valid partial parameters");

        let defaults = EnergyProfileParameters::default();
        assert_abs_diff_eq!(params.idling.base, 100.0);
        assert_eq!(params.idling.dist_coef, defaults.idling.dist_coef);
        assert_abs_diff_eq!(params.movement.opt_duration.right_dur_shift, 1.5);
        assert_abs_diff_eq!(
            params.movement.opt_duration.left_dur_shift,
            defaults.movement.opt_duration.left_dur_shift
        );
        assert_eq!(
            params.movement.min_duration,
            defaults.movement.min_duration
        );
    }

    #[test]
    fn toml_quad_coefficients_are_upper_case() {
        let params = EnergyProfileParameters::from_toml_str(
            r#"
            [idling.dist_coef]
            A = 0.0
            B = 0.0
            C = 1.0
            "#,
        )
        .expect("valid partial parameters");

        assert_eq!(params.idling.dist_coef, QuadCoefs::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn per_direction_merge_is_field_wise() {
        let params = EnergyProfileParameters::from_toml_str(
            r#"
            [movement.min_duration.type_factor]
            side = 2.0
            "#,
        )
        .expect("valid partial parameters");

        let defaults = EnergyProfileParameters::default();
        assert_abs_diff_eq!(params.movement.min_duration.type_factor.side, 2.0);
        assert_abs_diff_eq!(
            params.movement.min_duration.type_factor.up,
            defaults.movement.min_duration.type_factor.up
        );
    }

    #[test]
    fn default_relative_weight_of_calibration_robot_is_one() {
        let params = EnergyProfileParameters::default();
        let relative_weight = 300.0 * params.common.robot_weight_coef;
        assert_abs_diff_eq!(relative_weight, 1.0);
    }
}
