//! Token converter: curl tokens to a [`RequestConfiguration`].
//!
//! The converter walks the tokens with a single forward cursor. A flag that
//! takes a value always consumes the *next* token, whatever its kind; short
//! flags may carry the value attached (`-XPOST`) and switches may be bundled
//! (`-sSL`).
//!
//! Merge rules: headers, data, form fields, query parameters and cookies
//! accumulate across repeated flags. Every scalar option (method, URL,
//! output, timeouts, ...) is replaced, so the last occurrence wins.
//!
//! A positional argument that looks like a URL (`scheme://...`) becomes the
//! URL while none is set. Any other positional argument is applied as another
//! value of the most recent data-bearing flag (`-H`, `-d` family, `--json`,
//! `-F`). With no such flag it fills a still-missing URL, with `http://`
//! prepended when it has no scheme, and is rejected otherwise.

use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::{
    Auth, FormField, FormValue, MAX_REDIRECTS_CEILING, ProxyOptions, RequestConfiguration,
};
use crate::flag::Flag;
use crate::retry::{RetryPolicy, TRANSIENT_STATUS_CODES};
use crate::token::{Token, TokenKind, is_url_like};
use crate::validate::{ValidationError, Validator};
use crate::{Error, Method, Result};

/// Characters `--data-urlencode` keeps as-is.
const URLENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Ceiling on the exponential `--retry` delay when `--retry-max-time` is absent.
const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(600);

/// Converts tokens into a validated [`RequestConfiguration`].
#[derive(Debug, Clone, Default)]
pub struct Converter {
    validator: Validator,
}

impl Converter {
    /// A converter that validates with `validator`.
    #[must_use]
    pub const fn new(validator: Validator) -> Self {
        Self { validator }
    }

    /// Convert `tokens`.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingValue`] when a flag that takes a value ends the input
    /// - [`Error::UnknownFlag`] for options outside the supported set
    /// - [`Error::Parse`] for a positional argument with nowhere to go
    /// - [`Error::Validation`] for bad option values and rule violations,
    ///   including a missing URL
    /// - [`Error::Io`] when an `@file` cannot be read
    pub fn convert(&self, tokens: &[Token]) -> Result<RequestConfiguration> {
        let mut state = State::default();
        let mut cursor = tokens.iter();

        while let Some(token) = cursor.next() {
            match token.kind() {
                TokenKind::Flag => {
                    let raw = token.raw();
                    if let Some(name) = raw.strip_prefix("--") {
                        let flag = Flag::from_long(name).ok_or_else(|| unknown(token))?;
                        let value = if flag.takes_value() {
                            Some(next_value(&mut cursor, raw)?)
                        } else {
                            None
                        };
                        state.apply(flag, raw, value)?;
                    } else {
                        convert_short(&mut state, token, &mut cursor)?;
                    }
                }
                TokenKind::Value | TokenKind::Url | TokenKind::Literal => {
                    state.positional(token)?;
                }
            }
        }

        let config = state.finish()?;
        self.validator.validate(&config)?;
        Ok(config)
    }
}

/// Convert with the default validator.
///
/// # Errors
///
/// See [`Converter::convert`].
pub fn convert(tokens: &[Token]) -> Result<RequestConfiguration> {
    Converter::default().convert(tokens)
}

fn convert_short<'a>(
    state: &mut State,
    token: &Token,
    cursor: &mut impl Iterator<Item = &'a Token>,
) -> Result<()> {
    let letters = token.raw().get(1..).unwrap_or_default();
    for (offset, letter) in letters.char_indices() {
        let flag = Flag::from_short(letter).ok_or_else(|| unknown(token))?;
        let written = format!("-{letter}");
        if !flag.takes_value() {
            state.apply(flag, &written, None)?;
            continue;
        }
        let attached = letters.get(offset + letter.len_utf8()..).unwrap_or_default();
        let value = if attached.is_empty() {
            next_value(cursor, &written)?
        } else {
            attached
        };
        return state.apply(flag, &written, Some(value));
    }
    Ok(())
}

fn unknown(token: &Token) -> Error {
    Error::UnknownFlag {
        flag: token.raw().to_string(),
        position: token.position(),
    }
}

fn next_value<'a>(cursor: &mut impl Iterator<Item = &'a Token>, flag: &str) -> Result<&'a str> {
    cursor
        .next()
        .map(Token::raw)
        .ok_or_else(|| Error::missing_value(flag))
}

fn invalid(flag: &str, value: &str, reason: impl Into<String>) -> Error {
    ValidationError::invalid_option(flag, value, reason).into()
}

// ============================================================================
// Conversion state
// ============================================================================

#[derive(Default)]
struct State {
    config: RequestConfiguration,
    /// Most recent data-bearing flag, for positional arguments.
    context: Option<Flag>,
    get: bool,
    form_data: bool,
    json: bool,
    proxy_user: Option<(String, Option<String>)>,
    retries: Option<u32>,
    retry_delay: Option<Duration>,
    retry_max_time: Option<Duration>,
}

impl State {
    fn positional(&mut self, token: &Token) -> Result<()> {
        let raw = token.raw();
        if self.config.url.is_empty() && is_url_like(raw) {
            self.config.url = raw.to_string();
            return Ok(());
        }
        match self.context {
            Some(flag) => self.apply(flag, &flag.to_string(), Some(raw)),
            None if self.config.url.is_empty() => {
                self.config.url = normalize_url(raw);
                Ok(())
            }
            None => Err(Error::Parse {
                message: "unexpected argument".to_string(),
                snippet: raw.chars().take(24).collect(),
                position: token.position(),
            }),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn apply(&mut self, flag: Flag, written: &str, value: Option<&str>) -> Result<()> {
        let value = value.unwrap_or_default();
        if flag.is_data_bearing() {
            self.context = Some(flag);
        }

        let config = &mut self.config;
        match flag {
            Flag::Request => config.method = Some(Method::from_str(value)?),
            Flag::Header => apply_header(config, written, value)?,
            Flag::Data => {
                let data = match value.strip_prefix('@') {
                    Some(path) => {
                        let mut data = read_data(path)?;
                        data.retain(|b| !matches!(b, b'\r' | b'\n'));
                        data
                    }
                    None => value.as_bytes().to_vec(),
                };
                config.body.append(&data, "&");
                self.form_data = true;
            }
            Flag::DataRaw => {
                config.body.append(value.as_bytes(), "&");
                self.form_data = true;
            }
            Flag::DataBinary => {
                let data = match value.strip_prefix('@') {
                    Some(path) => read_data(path)?,
                    None => value.as_bytes().to_vec(),
                };
                config.body.append(&data, "&");
                self.form_data = true;
            }
            Flag::DataUrlencode => {
                let encoded = urlencode_data(value)?;
                config.body.append(encoded.as_bytes(), "&");
                self.form_data = true;
            }
            Flag::Json => {
                let data = match value.strip_prefix('@') {
                    Some(path) => read_data(path)?,
                    None => value.as_bytes().to_vec(),
                };
                config.body.append(&data, "");
                self.json = true;
            }
            Flag::Form => config.form.push(parse_form(written, value, true)?),
            Flag::FormString => config.form.push(parse_form(written, value, false)?),
            Flag::Get => self.get = true,
            Flag::Head => config.method = Some(Method::Head),
            Flag::Url => config.url = normalize_url(value),
            Flag::User => {
                config.auth = match value.split_once(':') {
                    Some((username, password)) => Auth::Basic {
                        username: username.to_string(),
                        password: Some(password.to_string()),
                    },
                    None => Auth::Basic {
                        username: value.to_string(),
                        password: None,
                    },
                };
            }
            Flag::OAuth2Bearer => {
                config.auth = Auth::Bearer {
                    token: value.to_string(),
                };
            }
            Flag::Cookie => {
                if !value.contains('=') {
                    return Err(invalid(written, value, "cookie files are not supported"));
                }
                config.cookies.extend(
                    value
                        .split(';')
                        .filter_map(|pair| pair.trim().split_once('='))
                        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string())),
                );
            }
            Flag::UserAgent => config.headers.set("User-Agent", value),
            Flag::Referer => config.headers.set("Referer", value),
            Flag::Output => config.output = Some(PathBuf::from(value)),
            Flag::Location => config.redirect.follow = true,
            Flag::MaxRedirs => {
                config.redirect.max_redirects = match value.trim().parse::<i64>() {
                    Ok(-1) => MAX_REDIRECTS_CEILING,
                    Ok(n) => usize::try_from(n)
                        .map_err(|_| invalid(written, value, "expected -1 or a count"))?,
                    Err(_) => return Err(invalid(written, value, "expected -1 or a count")),
                };
            }
            Flag::ConnectTimeout => config.connect_timeout = Some(parse_seconds(written, value)?),
            Flag::MaxTime => config.timeout = Some(parse_seconds(written, value)?),
            Flag::Retry => {
                self.retries = Some(
                    value
                        .trim()
                        .parse()
                        .map_err(|_| invalid(written, value, "expected a retry count"))?,
                );
            }
            Flag::RetryDelay => self.retry_delay = Some(parse_seconds(written, value)?),
            Flag::RetryMaxTime => self.retry_max_time = Some(parse_seconds(written, value)?),
            Flag::Proxy => config.proxy = Some(ProxyOptions::new(value)),
            Flag::ProxyUser => {
                self.proxy_user = Some(match value.split_once(':') {
                    Some((user, password)) => (user.to_string(), Some(password.to_string())),
                    None => (value.to_string(), None),
                });
            }
            Flag::Insecure => config.tls.insecure = true,
            Flag::CaCert => config.tls.ca_cert = Some(PathBuf::from(value)),
            Flag::Cert => config.tls.client_cert = Some(PathBuf::from(value)),
            Flag::Key => config.tls.client_key = Some(PathBuf::from(value)),
            Flag::Compressed => config.compressed = true,
            Flag::MaxFilesize => config.max_response_size = Some(parse_size(written, value)?),
            Flag::Fail => config.fail_on_error = true,
            Flag::AllowInsecureAuth => config.allow_insecure_credentials = true,
            Flag::Silent | Flag::ShowError | Flag::Verbose | Flag::Include | Flag::ProgressBar => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<RequestConfiguration> {
        let Self {
            mut config,
            get,
            form_data,
            json,
            proxy_user,
            retries,
            retry_delay,
            retry_max_time,
            ..
        } = self;

        if config.url.is_empty() {
            return Err(ValidationError::MissingUrl.into());
        }

        if get {
            let body = std::mem::take(&mut config.body);
            let data = body.to_bytes(usize::MAX)?;
            let pairs: Vec<(String, String)> = serde_html_form::from_bytes(&data).map_err(|e| {
                ValidationError::invalid_option(
                    Flag::Get.to_string(),
                    String::from_utf8_lossy(&data),
                    e.to_string(),
                )
            })?;
            config.query.extend(pairs);
            if config.method.is_none() {
                config.method = Some(Method::Get);
            }
        } else if form_data && !json && !config.body.is_empty() && !config.headers.contains("Content-Type") {
            config
                .headers
                .append("Content-Type", "application/x-www-form-urlencoded");
        }

        if json {
            if !config.headers.contains("Content-Type") {
                config.headers.append("Content-Type", "application/json");
            }
            if !config.headers.contains("Accept") {
                config.headers.append("Accept", "application/json");
            }
        }

        if let Some((user, password)) = proxy_user {
            config.proxy = config.proxy.map(|proxy| proxy.with_auth(user, password));
        }

        if let Some(retries) = retries {
            let attempts = retries.saturating_add(1);
            config.retry = match retry_delay {
                Some(delay) => RetryPolicy::fixed(attempts, delay),
                None => RetryPolicy::exponential(
                    attempts,
                    Duration::from_secs(1),
                    retry_max_time.unwrap_or(DEFAULT_RETRY_MAX_DELAY),
                ),
            }
            .with_status_codes(TRANSIENT_STATUS_CODES);
        }

        config.resolve_method();
        Ok(config)
    }
}

// ============================================================================
// Value parsing
// ============================================================================

/// Prepends `http://` to a scheme-less URL, as curl does.
fn normalize_url(raw: &str) -> String {
    if raw.contains("://") || raw.is_empty() {
        raw.to_string()
    } else {
        format!("http://{raw}")
    }
}

/// `@-` reads standard input.
fn read_data(path: &str) -> Result<Vec<u8>> {
    if path == "-" {
        let mut data = Vec::new();
        std::io::stdin().read_to_end(&mut data)?;
        return Ok(data);
    }
    Ok(std::fs::read(path)?)
}

fn apply_header(config: &mut RequestConfiguration, written: &str, value: &str) -> Result<()> {
    if let Some((name, rest)) = value.split_once(':') {
        let name = name.trim();
        let rest = rest.trim();
        if name.is_empty() {
            return Err(invalid(written, value, "missing header name"));
        }
        if rest.is_empty() {
            config.headers.remove(name);
        } else {
            config.headers.append(name, rest);
        }
        return Ok(());
    }
    match value.trim().strip_suffix(';') {
        Some(name) if !name.is_empty() => {
            config.headers.append(name, "");
            Ok(())
        }
        _ => Err(invalid(written, value, "expected `Name: value`")),
    }
}

/// `content`, `=content`, `name=content`, `@file` or `name@file`.
fn urlencode_data(value: &str) -> Result<String> {
    let split = value.find(['=', '@']);
    let (name, content) = match split {
        Some(index) if value.as_bytes().get(index) == Some(&b'@') => {
            let (name, path) = value.split_at(index);
            let data = read_data(path.get(1..).unwrap_or_default())?;
            (name, String::from_utf8_lossy(&data).into_owned())
        }
        Some(index) => {
            let (name, content) = value.split_at(index);
            (name, content.get(1..).unwrap_or_default().to_string())
        }
        None => ("", value.to_string()),
    };
    let encoded = utf8_percent_encode(&content, URLENCODE_SET).to_string();
    Ok(if name.is_empty() {
        encoded
    } else {
        format!("{name}={encoded}")
    })
}

/// `name=value`; with `files` set, `@path` attaches a file and `<path`
/// inlines its text.
fn parse_form(written: &str, value: &str, files: bool) -> Result<FormField> {
    let (name, content) = value
        .split_once('=')
        .ok_or_else(|| invalid(written, value, "expected `name=value`"))?;
    let value = match (files, content.chars().next()) {
        (true, Some('@')) => FormValue::File(PathBuf::from(content.get(1..).unwrap_or_default())),
        (true, Some('<')) => {
            let data = read_data(content.get(1..).unwrap_or_default())?;
            FormValue::Text(String::from_utf8_lossy(&data).into_owned())
        }
        _ => FormValue::Text(content.to_string()),
    };
    Ok(FormField {
        name: name.to_string(),
        value,
    })
}

/// Fractional seconds, as curl accepts for timeouts.
fn parse_seconds(written: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| invalid(written, value, "expected a non-negative number of seconds"))
}

/// Bytes with an optional `k`, `M` or `G` suffix.
fn parse_size(written: &str, value: &str) -> Result<u64> {
    let value_trimmed = value.trim();
    let (digits, multiplier) = match value_trimmed.char_indices().last() {
        Some((index, 'k' | 'K')) => (value_trimmed.get(..index), 1024),
        Some((index, 'm' | 'M')) => (value_trimmed.get(..index), 1024 * 1024),
        Some((index, 'g' | 'G')) => (value_trimmed.get(..index), 1024 * 1024 * 1024),
        _ => (Some(value_trimmed), 1),
    };
    digits
        .and_then(|digits| digits.parse::<u64>().ok())
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| invalid(written, value, "expected a size in bytes"))
}
