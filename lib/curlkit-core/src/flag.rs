//! The supported curl options.
//!
//! [`Flag`] is a closed set: every option the converter understands has a
//! variant, and anything else is reported as [`crate::Error::UnknownFlag`].

use std::fmt;

/// A recognized curl option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `-X`, `--request`
    Request,
    /// `-H`, `--header`
    Header,
    /// `-d`, `--data`, `--data-ascii`
    Data,
    /// `--data-raw`
    DataRaw,
    /// `--data-binary`
    DataBinary,
    /// `--data-urlencode`
    DataUrlencode,
    /// `--json`
    Json,
    /// `-F`, `--form`
    Form,
    /// `--form-string`
    FormString,
    /// `-G`, `--get`
    Get,
    /// `-I`, `--head`
    Head,
    /// `--url`
    Url,
    /// `-u`, `--user`
    User,
    /// `--oauth2-bearer`
    OAuth2Bearer,
    /// `-b`, `--cookie`
    Cookie,
    /// `-A`, `--user-agent`
    UserAgent,
    /// `-e`, `--referer`
    Referer,
    /// `-o`, `--output`
    Output,
    /// `-L`, `--location`
    Location,
    /// `--max-redirs`
    MaxRedirs,
    /// `--connect-timeout`
    ConnectTimeout,
    /// `-m`, `--max-time`
    MaxTime,
    /// `--retry`
    Retry,
    /// `--retry-delay`
    RetryDelay,
    /// `--retry-max-time`
    RetryMaxTime,
    /// `-x`, `--proxy`
    Proxy,
    /// `-U`, `--proxy-user`
    ProxyUser,
    /// `-k`, `--insecure`
    Insecure,
    /// `--cacert`
    CaCert,
    /// `-E`, `--cert`
    Cert,
    /// `--key`
    Key,
    /// `--compressed`
    Compressed,
    /// `--max-filesize`
    MaxFilesize,
    /// `-f`, `--fail`
    Fail,
    /// `--allow-insecure-auth`
    AllowInsecureAuth,
    /// `-s`, `--silent`
    Silent,
    /// `-S`, `--show-error`
    ShowError,
    /// `-v`, `--verbose`
    Verbose,
    /// `-i`, `--include`
    Include,
    /// `-#`, `--progress-bar`
    ProgressBar,
}

impl Flag {
    /// Look up a long option name, without the leading `--`.
    #[must_use]
    pub fn from_long(name: &str) -> Option<Self> {
        let flag = match name {
            "request" => Self::Request,
            "header" => Self::Header,
            "data" | "data-ascii" => Self::Data,
            "data-raw" => Self::DataRaw,
            "data-binary" => Self::DataBinary,
            "data-urlencode" => Self::DataUrlencode,
            "json" => Self::Json,
            "form" => Self::Form,
            "form-string" => Self::FormString,
            "get" => Self::Get,
            "head" => Self::Head,
            "url" => Self::Url,
            "user" => Self::User,
            "oauth2-bearer" => Self::OAuth2Bearer,
            "cookie" => Self::Cookie,
            "user-agent" => Self::UserAgent,
            "referer" => Self::Referer,
            "output" => Self::Output,
            "location" => Self::Location,
            "max-redirs" => Self::MaxRedirs,
            "connect-timeout" => Self::ConnectTimeout,
            "max-time" => Self::MaxTime,
            "retry" => Self::Retry,
            "retry-delay" => Self::RetryDelay,
            "retry-max-time" => Self::RetryMaxTime,
            "proxy" => Self::Proxy,
            "proxy-user" => Self::ProxyUser,
            "insecure" => Self::Insecure,
            "cacert" => Self::CaCert,
            "cert" => Self::Cert,
            "key" => Self::Key,
            "compressed" => Self::Compressed,
            "max-filesize" => Self::MaxFilesize,
            "fail" => Self::Fail,
            "allow-insecure-auth" => Self::AllowInsecureAuth,
            "silent" => Self::Silent,
            "show-error" => Self::ShowError,
            "verbose" => Self::Verbose,
            "include" => Self::Include,
            "progress-bar" => Self::ProgressBar,
            _ => return None,
        };
        Some(flag)
    }

    /// Look up a single-letter option.
    #[must_use]
    pub const fn from_short(letter: char) -> Option<Self> {
        let flag = match letter {
            'X' => Self::Request,
            'H' => Self::Header,
            'd' => Self::Data,
            'F' => Self::Form,
            'G' => Self::Get,
            'I' => Self::Head,
            'u' => Self::User,
            'b' => Self::Cookie,
            'A' => Self::UserAgent,
            'e' => Self::Referer,
            'o' => Self::Output,
            'L' => Self::Location,
            'm' => Self::MaxTime,
            'x' => Self::Proxy,
            'U' => Self::ProxyUser,
            'k' => Self::Insecure,
            'E' => Self::Cert,
            'f' => Self::Fail,
            's' => Self::Silent,
            'S' => Self::ShowError,
            'v' => Self::Verbose,
            'i' => Self::Include,
            '#' => Self::ProgressBar,
            _ => return None,
        };
        Some(flag)
    }

    /// Canonical long name, without the leading `--`.
    #[must_use]
    pub const fn long_name(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Header => "header",
            Self::Data => "data",
            Self::DataRaw => "data-raw",
            Self::DataBinary => "data-binary",
            Self::DataUrlencode => "data-urlencode",
            Self::Json => "json",
            Self::Form => "form",
            Self::FormString => "form-string",
            Self::Get => "get",
            Self::Head => "head",
            Self::Url => "url",
            Self::User => "user",
            Self::OAuth2Bearer => "oauth2-bearer",
            Self::Cookie => "cookie",
            Self::UserAgent => "user-agent",
            Self::Referer => "referer",
            Self::Output => "output",
            Self::Location => "location",
            Self::MaxRedirs => "max-redirs",
            Self::ConnectTimeout => "connect-timeout",
            Self::MaxTime => "max-time",
            Self::Retry => "retry",
            Self::RetryDelay => "retry-delay",
            Self::RetryMaxTime => "retry-max-time",
            Self::Proxy => "proxy",
            Self::ProxyUser => "proxy-user",
            Self::Insecure => "insecure",
            Self::CaCert => "cacert",
            Self::Cert => "cert",
            Self::Key => "key",
            Self::Compressed => "compressed",
            Self::MaxFilesize => "max-filesize",
            Self::Fail => "fail",
            Self::AllowInsecureAuth => "allow-insecure-auth",
            Self::Silent => "silent",
            Self::ShowError => "show-error",
            Self::Verbose => "verbose",
            Self::Include => "include",
            Self::ProgressBar => "progress-bar",
        }
    }

    /// Returns `true` if the option consumes the following token.
    #[must_use]
    pub const fn takes_value(self) -> bool {
        !matches!(
            self,
            Self::Get
                | Self::Head
                | Self::Location
                | Self::Insecure
                | Self::Compressed
                | Self::Fail
                | Self::AllowInsecureAuth
                | Self::Silent
                | Self::ShowError
                | Self::Verbose
                | Self::Include
                | Self::ProgressBar
        )
    }

    /// Returns `true` for options whose extra positional arguments are
    /// applied as further values of the same option.
    #[must_use]
    pub const fn is_data_bearing(self) -> bool {
        matches!(
            self,
            Self::Header
                | Self::Data
                | Self::DataRaw
                | Self::DataBinary
                | Self::DataUrlencode
                | Self::Json
                | Self::Form
                | Self::FormString
        )
    }

    /// Returns `true` for options that only affect curl's terminal output.
    #[must_use]
    pub const fn is_display_only(self) -> bool {
        matches!(
            self,
            Self::Silent | Self::ShowError | Self::Verbose | Self::Include | Self::ProgressBar
        )
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{}", self.long_name())
    }
}
