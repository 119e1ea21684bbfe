use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "DoseWise";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default log filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "info,dosewise=debug".to_string()
}

/// Get the application data directory
/// ~/DoseWise/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("DoseWise")
}

/// Default SQLite database path.
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("dosewise.db")
}

/// Runtime configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file. `DOSEWISE_DB`.
    pub database_path: PathBuf,
    /// HTTP listen address. `DOSEWISE_LISTEN`.
    pub listen_addr: SocketAddr,
    /// Email API key for caretaker notifications. `RESEND_API_KEY`.
    pub email_api_key: Option<String>,
    /// From-address for outgoing email. `DOSEWISE_MAIL_FROM`.
    pub mail_from: String,
    /// AI gateway key for prescription analysis. `AI_GATEWAY_API_KEY`.
    pub gateway_api_key: Option<String>,
    /// Pending doses older than this many hours are swept to `missed`
    /// by the rollover task. `DOSEWISE_AUTO_EXPIRE_HOURS`; `off`
    /// disables the sweep.
    pub auto_expire_hours: Option<i64>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_path = std::env::var("DOSEWISE_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_database_path());

        let listen_addr = std::env::var("DOSEWISE_LISTEN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8710)));

        let auto_expire_hours = match std::env::var("DOSEWISE_AUTO_EXPIRE_HOURS") {
            Ok(v) if v.eq_ignore_ascii_case("off") => None,
            Ok(v) => v.parse().ok().or(Some(12)),
            Err(_) => Some(12),
        };

        Self {
            database_path,
            listen_addr,
            email_api_key: std::env::var("RESEND_API_KEY").ok(),
            mail_from: std::env::var("DOSEWISE_MAIL_FROM")
                .unwrap_or_else(|_| "DoseWise Reminder <onboarding@resend.dev>".to_string()),
            gateway_api_key: std::env::var("AI_GATEWAY_API_KEY").ok(),
            auto_expire_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("DoseWise"));
    }

    #[test]
    fn database_under_app_data() {
        let db = default_database_path();
        assert!(db.starts_with(app_data_dir()));
    }

    #[test]
    fn app_name_is_dosewise() {
        assert_eq!(APP_NAME, "DoseWise");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
