//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use iagos_envri::ClientConfig;

/// Download an IAGOS flight as NetCDF using an ENVRI-ID token.
///
/// The token is pasted on stdin, or obtained through the OAuth2 device flow
/// with `--oauth`. The AERIS-protected API introspects it before serving the
/// file.
#[derive(Parser, Debug)]
#[command(name = "iagos-download")]
#[command(author, version, about)]
pub struct Args {
    /// Flight identifier, e.g. 2023050203041714
    pub flight: String,

    /// Directory receiving <FLIGHT>.nc (default: config file, else the system temp dir)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Obtain the token with the OAuth2 device flow instead of pasting it
    #[arg(long)]
    pub oauth: bool,

    /// Read configuration from this file instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the download service URL
    #[arg(long, value_name = "URL")]
    pub service_url: Option<String>,

    /// Override the OpenID Connect base URL
    #[arg(long, value_name = "URL")]
    pub auth_base_url: Option<String>,

    /// Override the OAuth2 client identifier
    #[arg(long, value_name = "ID")]
    pub client_id: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Log filter used when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Applies command-line overrides on top of file and built-in values.
    #[must_use]
    pub fn apply_overrides(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(service_url) = &self.service_url {
            config.service_url.clone_from(service_url);
        }
        if let Some(auth_base_url) = &self.auth_base_url {
            config.auth_base_url.clone_from(auth_base_url);
        }
        if let Some(client_id) = &self.client_id {
            config.client_id.clone_from(client_id);
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir.clone_from(output_dir);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flight_only_parses_successfully() {
        let args = Args::try_parse_from(["iagos-download", "2023050203041714"]).unwrap();
        assert_eq!(args.flight, "2023050203041714");
        assert!(!args.oauth);
        assert!(args.output_dir.is_none());
        assert_eq!(args.default_log_level(), "info");
    }

    #[test]
    fn test_cli_missing_flight_is_rejected() {
        let err = Args::try_parse_from(["iagos-download"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_oauth_and_output_dir() {
        let args =
            Args::try_parse_from(["iagos-download", "--oauth", "-o", "/data", "F1"]).unwrap();
        assert!(args.oauth);
        assert_eq!(args.output_dir, Some(PathBuf::from("/data")));
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["iagos-download", "-v", "F1"]).unwrap();
        assert_eq!(args.default_log_level(), "debug");

        let args = Args::try_parse_from(["iagos-download", "-vv", "F1"]).unwrap();
        assert_eq!(args.default_log_level(), "trace");
    }

    #[test]
    fn test_cli_quiet_flag_sets_error_level() {
        let args = Args::try_parse_from(["iagos-download", "-q", "F1"]).unwrap();
        assert_eq!(args.default_log_level(), "error");
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        let err = Args::try_parse_from(["iagos-download", "-q", "-v", "F1"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["iagos-download", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let args = Args::try_parse_from([
            "iagos-download",
            "--service-url",
            "http://localhost:8080/downloads",
            "--client-id",
            "other-cli",
            "-o",
            "/out",
            "F1",
        ])
        .unwrap();
        let config = args.apply_overrides(ClientConfig::default());
        assert_eq!(config.service_url, "http://localhost:8080/downloads");
        assert_eq!(config.client_id, "other-cli");
        assert_eq!(config.output_dir, PathBuf::from("/out"));
        assert_eq!(config.scope, ClientConfig::default().scope);
    }

    #[test]
    fn test_cli_non_http_override_fails_validation() {
        let args =
            Args::try_parse_from(["iagos-download", "--auth-base-url", "ftp://idp", "F1"]).unwrap();
        let err = args
            .apply_overrides(ClientConfig::default())
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("auth_base_url"), "{err}");
    }
}
