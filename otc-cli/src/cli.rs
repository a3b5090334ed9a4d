//! Command-line definition
//!
//! Every setting layers flag > environment > built-in default; clap's `env`
//! support does the layering, and [`ConfigArgs::to_config`] produces the one
//! explicit `AuthConfig` the core consumes.

use clap::{Args, Parser, Subcommand};
use otc_auth::config::{
    DEFAULT_OUTPUT_FILE, DEFAULT_REDIRECT_PORT, DEFAULT_REGION, DEFAULT_SCOPES,
};
use otc_auth::{AuthConfig, iam_endpoint_for_region};

/// Command-line client for Open Telekom Cloud identity and credentials.
#[derive(Debug, Parser)]
#[command(name = "otc-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Authenticate and generate temporary credentials
    ///
    /// Federated OIDC login by default; pass --iam for direct
    /// username/password authentication against the identity service.
    Login(LoginArgs),

    /// Clear the cached authentication token
    Logout,

    /// Issue temporary access-key credentials with a chosen lifetime
    Credentials(CredentialArgs),

    /// List the projects your domain can see
    Projects(ProjectsArgs),
}

/// Configuration shared by all flows (flag > env > default).
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Identity provider base URL
    #[arg(long, env = "IDP_URL")]
    pub idp_url: Option<String>,

    /// OAuth client id registered at the identity provider
    #[arg(long, env = "IDP_CLIENT_ID")]
    pub idp_client_id: Option<String>,

    /// Identity provider name registered with the federation service
    #[arg(long = "idp-provider", env = "IDP_PROVIDER_NAME")]
    pub idp_provider_name: Option<String>,

    /// Federation protocol (oidc or saml)
    #[arg(long, env = "IDP_PROTOCOL", default_value = "oidc")]
    pub idp_protocol: String,

    /// Cloud domain name
    #[arg(long, env = "OS_DOMAIN_NAME")]
    pub domain_name: Option<String>,

    /// Identity endpoint (defaults to the region's IAM endpoint)
    #[arg(long, env = "OS_AUTH_URL")]
    pub auth_url: Option<String>,

    /// Region
    #[arg(long, env = "OS_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// Local port for the OAuth callback listener
    #[arg(long = "port", env = "REDIRECT_PORT", default_value_t = DEFAULT_REDIRECT_PORT)]
    pub redirect_port: u16,

    /// Output file stem for the credential shell script
    #[arg(long = "output", env = "OUTPUT_FILE", default_value = DEFAULT_OUTPUT_FILE)]
    pub output_file: String,

    /// Print the authorization URL instead of opening a browser
    #[arg(long, env = "NO_BROWSER")]
    pub no_browser: bool,

    /// PKCE method (S256 or plain)
    #[arg(long, env = "CODE_CHALLENGE_METHOD", default_value = "S256")]
    pub code_challenge_method: String,

    /// OIDC scopes requested in the authorization request
    #[arg(long = "scope", env = "OIDC_SCOPE", default_value = DEFAULT_SCOPES)]
    pub scopes: String,
}

impl ConfigArgs {
    /// Collapse the layered flags into the core's configuration struct.
    pub fn to_config(&self) -> AuthConfig {
        AuthConfig {
            idp_url: self.idp_url.clone().unwrap_or_default(),
            idp_client_id: self.idp_client_id.clone().unwrap_or_default(),
            idp_provider_name: self.idp_provider_name.clone().unwrap_or_default(),
            idp_protocol: self.idp_protocol.clone(),
            domain_name: self.domain_name.clone().unwrap_or_default(),
            auth_url: self
                .auth_url
                .clone()
                .unwrap_or_else(|| iam_endpoint_for_region(&self.region)),
            region: self.region.clone(),
            redirect_port: self.redirect_port,
            output_file: self.output_file.clone(),
            no_browser: self.no_browser,
            code_challenge_method: self.code_challenge_method.clone(),
            scopes: self.scopes.clone(),
        }
    }
}

/// Arguments for `login`.
#[derive(Debug, Args)]
pub struct LoginArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Use direct IAM username/password authentication
    #[arg(long)]
    pub iam: bool,

    /// IAM username
    #[arg(long, env = "OS_USERNAME")]
    pub username: Option<String>,

    /// IAM password
    #[arg(long, env = "OS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments for `credentials`.
#[derive(Debug, Args)]
pub struct CredentialArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Lifetime of the issued credentials in seconds
    #[arg(long, default_value_t = 3600)]
    pub duration: u32,

    /// Project id or name (defaults to the first project)
    #[arg(long, short = 'p', default_value = "")]
    pub project: String,
}

/// Arguments for `projects`.
#[derive(Debug, Args)]
pub struct ProjectsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "otc-cli",
            "login",
            "--idp-url",
            "https://idp.example.com/realms/cloud",
            "--idp-client-id",
            "cli",
            "--idp-provider",
            "corp",
            "--domain-name",
            "OTC-EU-DE-000000",
            "--port",
            "9999",
            "--no-browser",
        ]);

        let Commands::Login(args) = cli.command else {
            panic!("expected login");
        };
        let cfg = args.config.to_config();
        assert_eq!(cfg.idp_url, "https://idp.example.com/realms/cloud");
        assert_eq!(cfg.redirect_port, 9999);
        assert!(cfg.no_browser);
        // Unset auth-url derives from the region.
        assert_eq!(cfg.auth_url, iam_endpoint_for_region(&cfg.region));
    }

    #[test]
    fn explicit_auth_url_wins_over_region_derivation() {
        let cli = Cli::parse_from([
            "otc-cli",
            "projects",
            "--auth-url",
            "https://iam.custom.example.com",
            "--region",
            "eu-nl",
        ]);

        let Commands::Projects(args) = cli.command else {
            panic!("expected projects");
        };
        assert_eq!(
            args.config.to_config().auth_url,
            "https://iam.custom.example.com"
        );
    }

    #[test]
    fn credentials_duration_defaults_to_an_hour() {
        let cli = Cli::parse_from(["otc-cli", "credentials"]);
        let Commands::Credentials(args) = cli.command else {
            panic!("expected credentials");
        };
        assert_eq!(args.duration, 3600);
        assert_eq!(args.project, "");
    }
}
