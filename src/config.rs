//! Run Configuration
//! Command-line surface and the settings it resolves to.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_OUTPUT: &str = "dashboard.html";
pub const DEFAULT_DEPARTEMENT: &str = "44";
pub const DEFAULT_DEPARTEMENT_LABEL: &str = "Loire-Atlantique";
pub const DEFAULT_ACADEMIE: &str = "NANTES";
pub const DEFAULT_NATURE_PREFIX: &str = "collège";
pub const DEFAULT_TOP: usize = 15;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required argument --{0}")]
    MissingArgument(&'static str),
}

/// Which rows of the national exports belong on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub departement: String,
    pub departement_label: String,
    pub academie: String,
    pub nature_prefix: String,
    /// Entries shown in each Top-N chart.
    pub top: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            departement: DEFAULT_DEPARTEMENT.to_string(),
            departement_label: DEFAULT_DEPARTEMENT_LABEL.to_string(),
            academie: DEFAULT_ACADEMIE.to_string(),
            nature_prefix: DEFAULT_NATURE_PREFIX.to_string(),
            top: DEFAULT_TOP,
        }
    }
}

/// Everything one dashboard run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub personnel: PathBuf,
    pub enrollment: PathBuf,
    pub ips: PathBuf,
    pub output: PathBuf,
    pub filters: FilterConfig,
}

impl DashboardConfig {
    /// Config with default output and filters.
    pub fn new(personnel: PathBuf, enrollment: PathBuf, ips: PathBuf) -> Self {
        Self {
            personnel,
            enrollment,
            ips,
            output: PathBuf::from(DEFAULT_OUTPUT),
            filters: FilterConfig::default(),
        }
    }

    /// Build the clap command.
    pub fn command() -> Command {
        Command::new("college-dashboard")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Generate the static HTML dashboard of public collèges (personnel, enrollment, IPS)")
            .arg(
                Arg::new("personnel")
                    .long("personnel")
                    .visible_alias("indicateurs")
                    .value_name("FILE")
                    .help("Personnel indicators CSV (fr-en-indicateurs_personnels_etablissements2d)")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("enrollment")
                    .long("enrollment")
                    .visible_alias("effectifs")
                    .value_name("FILE")
                    .help("Enrollment CSV (fr-en-effectifs-second-degre)")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("ips")
                    .long("ips")
                    .value_name("FILE")
                    .help("Social position index CSV (fr-en-ips_colleges)")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("output")
                    .short('o')
                    .long("output")
                    .value_name("FILE")
                    .help("Output HTML path")
                    .default_value(DEFAULT_OUTPUT)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("departement")
                    .long("departement")
                    .value_name("CODE")
                    .help("Department code")
                    .default_value(DEFAULT_DEPARTEMENT),
            )
            .arg(
                Arg::new("departement-label")
                    .long("departement-label")
                    .value_name("NAME")
                    .help("Department name shown in the title")
                    .default_value(DEFAULT_DEPARTEMENT_LABEL),
            )
            .arg(
                Arg::new("academie")
                    .long("academie")
                    .value_name("NAME")
                    .help("Académie label")
                    .default_value(DEFAULT_ACADEMIE),
            )
            .arg(
                Arg::new("nature-prefix")
                    .long("nature-prefix")
                    .value_name("PREFIX")
                    .help("Prefix of the establishment nature to keep")
                    .default_value(DEFAULT_NATURE_PREFIX),
            )
            .arg(
                Arg::new("top")
                    .long("top")
                    .value_name("N")
                    .help("Entries in each Top-N chart")
                    .value_parser(value_parser!(usize)),
            )
    }

    /// Resolve parsed arguments into a config.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, ConfigError> {
        let path = |id: &'static str| {
            matches
                .get_one::<PathBuf>(id)
                .cloned()
                .ok_or(ConfigError::MissingArgument(id))
        };
        let text = |id: &'static str, default: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            personnel: path("personnel")?,
            enrollment: path("enrollment")?,
            ips: path("ips")?,
            output: path("output")?,
            filters: FilterConfig {
                departement: text("departement", DEFAULT_DEPARTEMENT),
                departement_label: text("departement-label", DEFAULT_DEPARTEMENT_LABEL),
                academie: text("academie", DEFAULT_ACADEMIE),
                nature_prefix: text("nature-prefix", DEFAULT_NATURE_PREFIX),
                top: matches.get_one::<usize>("top").copied().unwrap_or(DEFAULT_TOP),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_french_flag_aliases() {
        let matches = DashboardConfig::command()
            .try_get_matches_from([
                "college-dashboard",
                "--indicateurs",
                "p.csv",
                "--effectifs",
                "e.csv",
                "--ips",
                "i.csv",
                "--top",
                "5",
            ])
            .unwrap();
        let config = DashboardConfig::from_matches(&matches).unwrap();
        assert_eq!(config.personnel, PathBuf::from("p.csv"));
        assert_eq!(config.enrollment, PathBuf::from("e.csv"));
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(config.filters.top, 5);
        assert_eq!(config.filters.departement, "44");
    }

    #[test]
    fn top_defaults_when_omitted() {
        let matches = DashboardConfig::command()
            .try_get_matches_from([
                "college-dashboard",
                "--personnel",
                "p.csv",
                "--enrollment",
                "e.csv",
                "--ips",
                "i.csv",
            ])
            .unwrap();
        let config = DashboardConfig::from_matches(&matches).unwrap();
        assert_eq!(config.filters.top, DEFAULT_TOP);
        assert_eq!(config.filters, FilterConfig::default());
    }

    #[test]
    fn requires_all_three_inputs() {
        let result = DashboardConfig::command()
            .try_get_matches_from(["college-dashboard", "--personnel", "p.csv", "--ips", "i.csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn command_is_well_formed() {
        DashboardConfig::command().debug_assert();
    }
}
