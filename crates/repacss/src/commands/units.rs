//! Unit conversion command handlers.

use serde::Serialize;

use repacss_core::UnitInfo;
use repacss_core::units::{to_watts, to_watts_sql};

use crate::cli::{UnitsArgs, UnitsCommand};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Conversion {
    value: f64,
    watts: f64,
    #[serde(flatten)]
    info: UnitInfo,
}

fn convert(value: f64, unit: &str) -> Conversion {
    Conversion {
        value,
        watts: to_watts(value, unit),
        info: UnitInfo::for_label(unit),
    }
}

fn detail(c: &Conversion) -> String {
    let note = if c.info.conversion_applied {
        ""
    } else {
        "  (no scaling)"
    };
    format!(
        "{} {} = {} {}{note}",
        c.value, c.info.original_unit, c.watts, c.info.converted_unit
    )
}

pub fn handle(args: UnitsArgs, settings: &Settings) -> Result<(), CliError> {
    if let Some(UnitsCommand::Sql { unit, column }) = args.command {
        let expr = to_watts_sql(&column, &unit);
        let out = output::render_single(settings.output, &expr, String::clone, String::clone)?;
        output::print_output(&out, settings.quiet);
        return Ok(());
    }

    let (Some(value), Some(unit)) = (args.value, args.unit) else {
        return Err(CliError::Validation {
            field: "value".into(),
            reason: "pass a reading and its unit, e.g. `repacss units 1500 mW`".into(),
        });
    };
    let conversion = convert(value, &unit);
    let out = output::render_single(settings.output, &conversion, detail, |c| {
        c.watts.to_string()
    })?;
    output::print_output(&out, settings.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn milliwatts_scale_down() {
        let c = convert(1500.0, "mW");
        assert_eq!(c.watts, 1.5);
        assert_eq!(detail(&c), "1500 mW = 1.5 W");
    }

    #[test]
    fn unknown_units_pass_through() {
        let c = convert(42.0, "VA");
        assert_eq!(c.watts, 42.0);
        assert!(detail(&c).ends_with("(no scaling)"));
    }
}
