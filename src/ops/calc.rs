use std::f64::consts::PI;

/// Error type for the shop calculators
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalcError {
    #[error("{0} must be a positive number")]
    NonPositive(&'static str),
    #[error("unknown unit category: {0}")]
    UnknownCategory(String),
    #[error("unknown unit {unit} for {category}")]
    UnknownUnit { category: String, unit: String },
}

fn positive(value: f64, name: &'static str) -> Result<f64, CalcError> {
    // NaN fails this comparison too
    if value > 0.0 {
        Ok(value)
    } else {
        Err(CalcError::NonPositive(name))
    }
}

// ---------------------------------------------------------------------------
// Hydraulic formulas
// ---------------------------------------------------------------------------

/// Water-like fluid density, kg/m³
const DENSITY: f64 = 1000.0;
/// Commercial steel pipe absolute roughness, m
const ROUGHNESS: f64 = 0.000045;
const PA_TO_PSI: f64 = 0.000145038;

/// Pressure drop along a straight pipe, in psi.
///
/// Darcy–Weisbach with the Swamee–Jain friction factor, or `64/Re` when the
/// flow is laminar (`Re < 2300`).
pub fn pressure_drop(flow_gpm: f64, diameter_in: f64, length_ft: f64, viscosity_cp: f64) -> Result<f64, CalcError> {
    let flow_gpm = positive(flow_gpm, "flow")?;
    let diameter_in = positive(diameter_in, "diameter")?;
    let length_ft = positive(length_ft, "length")?;
    let viscosity_cp = positive(viscosity_cp, "viscosity")?;

    let diameter_m = diameter_in * 0.0254;
    let length_m = length_ft * 0.3048;
    let flow_m3s = flow_gpm * 0.00378541 / 60.0;
    let area = PI * (diameter_m / 2.0).powi(2);
    let velocity = flow_m3s / area;

    let dynamic_viscosity = viscosity_cp / 1000.0; // Pa·s
    let reynolds = DENSITY * velocity * diameter_m / dynamic_viscosity;

    let friction = if reynolds < 2300.0 {
        64.0 / reynolds
    } else {
        let a = ROUGHNESS / (3.7 * diameter_m);
        let b = 5.74 / reynolds.powf(0.9);
        0.25 / (a + b).log10().powi(2)
    };

    let delta_pa = friction * (length_m / diameter_m) * 0.5 * DENSITY * velocity * velocity;
    Ok(delta_pa * PA_TO_PSI)
}

/// Extension force of a cylinder, in lbf: pressure × bore area.
pub fn cylinder_force(bore_in: f64, pressure_psi: f64) -> Result<f64, CalcError> {
    let bore_in = positive(bore_in, "bore diameter")?;
    let pressure_psi = positive(pressure_psi, "pressure")?;
    Ok(pressure_psi * PI * (bore_in / 2.0).powi(2))
}

/// Hydraulic pump input power, in hp: `Q·p / (1714·η)`.
pub fn pump_power(flow_gpm: f64, pressure_psi: f64, efficiency_pct: f64) -> Result<f64, CalcError> {
    let flow_gpm = positive(flow_gpm, "flow")?;
    let pressure_psi = positive(pressure_psi, "pressure")?;
    let efficiency = positive(efficiency_pct, "efficiency")? / 100.0;
    Ok(flow_gpm * pressure_psi / (1714.0 * efficiency))
}

// ---------------------------------------------------------------------------
// Unit conversion
// ---------------------------------------------------------------------------

/// A convertible unit: `value * to_base` gives the category's base unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub key: &'static str,
    pub to_base: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct UnitCategory {
    pub key: &'static str,
    pub units: &'static [Unit],
}

const fn unit(key: &'static str, to_base: f64) -> Unit {
    Unit { key, to_base }
}

pub const CATEGORIES: &[UnitCategory] = &[
    UnitCategory {
        key: "flow",
        units: &[
            unit("gpm", 1.0),
            unit("lpm", 0.264172),
            unit("cfm", 7.48052),
            unit("cms", 15850.3),
        ],
    },
    UnitCategory {
        key: "pressure",
        units: &[
            unit("psi", 1.0),
            unit("bar", 14.5038),
            unit("kpa", 0.145038),
        ],
    },
    UnitCategory {
        key: "force",
        units: &[
            unit("lbf", 1.0),
            unit("n", 0.224809),
        ],
    },
    UnitCategory {
        key: "power",
        units: &[
            unit("hp", 1.0),
            unit("kw", 1.34102),
            unit("w", 0.00134102),
        ],
    },
    UnitCategory {
        key: "length",
        units: &[
            unit("in", 1.0),
            unit("ft", 12.0),
            unit("mm", 0.0393701),
            unit("m", 39.3701),
        ],
    },
    UnitCategory {
        key: "torque",
        units: &[
            unit("ftlb", 1.0),
            unit("inlb", 0.0833333),
            unit("nm", 0.737562),
        ],
    },
];

pub fn category(key: &str) -> Result<&'static UnitCategory, CalcError> {
    CATEGORIES
        .iter()
        .find(|c| c.key.eq_ignore_ascii_case(key))
        .ok_or_else(|| CalcError::UnknownCategory(key.to_string()))
}

impl UnitCategory {
    pub fn unit(&self, key: &str) -> Result<&'static Unit, CalcError> {
        self.units
            .iter()
            .find(|u| u.key.eq_ignore_ascii_case(key))
            .ok_or_else(|| CalcError::UnknownUnit {
                category: self.key.to_string(),
                unit: key.to_string(),
            })
    }
}

/// Convert `value` between two units of one category. Returns the converted
/// value and the target unit.
pub fn convert(value: f64, category_key: &str, from: &str, to: &str) -> Result<(f64, &'static Unit), CalcError> {
    let value = positive(value, "value")?;
    let cat = category(category_key)?;
    let from = cat.unit(from)?;
    let to = cat.unit(to)?;
    Ok((value * from.to_base / to.to_base, to))
}
