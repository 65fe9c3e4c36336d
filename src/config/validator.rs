//! Settings validation: schema names become SQL identifiers, so they are checked before use.

use regex::Regex;

use crate::config::Settings;
use crate::error::ConfigError;

const IDENT_PATTERN: &str = r"^[a-z_][a-z0-9_]{0,62}$";

pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let re = Regex::new(IDENT_PATTERN).map_err(|_| ConfigError::InvalidVar {
        name: "LISTINGS_SCHEMA",
        value: IDENT_PATTERN.into(),
    })?;
    if !re.is_match(&settings.schemas.listings) {
        return Err(ConfigError::InvalidVar {
            name: "LISTINGS_SCHEMA",
            value: settings.schemas.listings.clone(),
        });
    }
    if !re.is_match(&settings.schemas.applications) {
        return Err(ConfigError::InvalidVar {
            name: "APPLICATIONS_SCHEMA",
            value: settings.schemas.applications.clone(),
        });
    }
    if settings.schemas.listings == settings.schemas.applications {
        return Err(ConfigError::InvalidVar {
            name: "APPLICATIONS_SCHEMA",
            value: format!("{} (must differ from LISTINGS_SCHEMA)", settings.schemas.applications),
        });
    }
    if settings.max_connections == 0 {
        return Err(ConfigError::InvalidVar {
            name: "DB_MAX_CONNECTIONS",
            value: "0".into(),
        });
    }
    Ok(())
}
