#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Interactive sign-in flow used when no cached or refreshable token exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AuthFlow {
    /// Show a code to enter at microsoft.com/devicelogin (public client).
    #[value(name = "device-code")]
    DeviceCode,
    /// Browser redirect plus client secret (confidential client).
    #[value(name = "auth-code")]
    AuthCode,
}
