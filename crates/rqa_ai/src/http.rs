use rqa_core::error::{codes, AppError};

/// Validates a provider base URL and strips trailing slashes.
///
/// Accepts `http`/`https` with a non-empty host and an optional port in 1..=65535.
/// Userinfo (`user@host`) is rejected so a URL cannot smuggle a different host.
pub(crate) fn normalize_base_url(raw: &str) -> Result<String, AppError> {
    let base_url = raw.trim().trim_end_matches('/').to_string();
    let invalid = |why: &str| {
        AppError::new(codes::CONFIG_INVALID, "Invalid provider base URL")
            .with_details(format!("base_url={base_url}; {why}"))
    };

    let rest = base_url
        .strip_prefix("http://")
        .or_else(|| base_url.strip_prefix("https://"))
        .ok_or_else(|| invalid("scheme must be http or https"))?;
    let authority = rest.split('/').next().unwrap_or("");
    if authority.contains('@') {
        return Err(invalid("userinfo is not allowed"));
    }

    let (host, port) = if let Some(v6) = authority.strip_prefix('[') {
        let end = v6.find(']').ok_or_else(|| invalid("unterminated IPv6 host"))?;
        let after = &v6[end + 1..];
        let port = match after {
            "" => None,
            p => Some(p.strip_prefix(':').ok_or_else(|| invalid("malformed port"))?),
        };
        (&v6[..end], port)
    } else {
        match authority.split_once(':') {
            Some((h, p)) => (h, Some(p)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(invalid("host is empty"));
    }
    if let Some(p) = port {
        match p.parse::<u16>() {
            Ok(n) if n > 0 => {}
            _ => return Err(invalid("port must be within 1..=65535")),
        }
    }
    Ok(base_url)
}

/// Maps a ureq failure to `PROVIDER_FAILED`. Transport errors, 429 and 5xx are retryable;
/// retrying is left to the caller.
pub(crate) fn provider_error(what: &str, model: &str, err: ureq::Error) -> AppError {
    match err {
        ureq::Error::Status(status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            AppError::new(codes::PROVIDER_FAILED, format!("{what} request failed"))
                .with_details(format!(
                    "status={status}; model={model}; body={}",
                    truncate_chars(body.trim(), 300)
                ))
                .with_retryable(status == 429 || status >= 500)
        }
        ureq::Error::Transport(t) => {
            AppError::new(codes::PROVIDER_FAILED, format!("Failed to call {what} endpoint"))
                .with_details(format!("model={model}; err={t}"))
                .with_retryable(true)
        }
    }
}

pub(crate) fn decode_error(what: &str, e: impl std::fmt::Display) -> AppError {
    AppError::new(codes::PROVIDER_FAILED, format!("Failed to decode {what} response"))
        .with_details(e.to_string())
}

pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
