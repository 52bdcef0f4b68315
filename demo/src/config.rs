use dotenv::var;
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::ffi::OsStr;
use std::path::Path;

/// Wiring and geometry of the display.
///
/// Loaded from the JSON file named by `CONFIG_FILE` (`s2plcd.json` by default) when it exists,
/// otherwise from the `S2PLCD_*` environment variables.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Config {
    #[serde(default = "default_gpio_chip")]
    pub gpio_chip: String,
    pub pin_latch: usize,
    pub pin_clock: usize,
    pub pin_data: usize,
    #[serde(default = "default_columns")]
    pub columns: u8,
    #[serde(default = "default_lines")]
    pub lines: u8,
}

fn default_gpio_chip() -> String {
    "/dev/gpiochip0".to_string()
}

fn default_columns() -> u8 {
    16
}

fn default_lines() -> u8 {
    2
}

impl Config {
    pub fn load() -> eyre::Result<Self> {
        match Self::try_load() {
            Some(config) => Ok(config),
            None => Self::from_lookup(|key| var(key).ok()),
        }
    }

    pub fn try_load() -> Option<Self> {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("s2plcd.json"));
        let config_path = Path::new(config_str);
        if config_path.exists() {
            let file = std::fs::File::open(config_path).ok()?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader).ok()
        } else {
            None
        }
    }

    /// Builds the config from `S2PLCD_*` variables, looked up through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let required = |key: &str| -> eyre::Result<usize> {
            let value = lookup(key).ok_or_else(|| eyre::eyre!("{} is not set", key))?;
            Ok(value.trim().parse()?)
        };
        let optional = |key: &str, default: u8| -> eyre::Result<u8> {
            match lookup(key) {
                Some(value) => Ok(value.trim().parse()?),
                None => Ok(default),
            }
        };

        Ok(Config {
            gpio_chip: lookup("S2PLCD_GPIO_CHIP").unwrap_or_else(default_gpio_chip),
            pin_latch: required("S2PLCD_PIN_LATCH")?,
            pin_clock: required("S2PLCD_PIN_CLOCK")?,
            pin_data: required("S2PLCD_PIN_DATA")?,
            columns: optional("S2PLCD_COLUMNS", default_columns())?,
            lines: optional("S2PLCD_LINES", default_lines())?,
        })
    }
}
