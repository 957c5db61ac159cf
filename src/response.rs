//! Response builders for redirects and file downloads.
//!
//! Header values are validated through [`HeaderValue`], so user-influenced
//! input such as a redirect target cannot smuggle CR/LF into the response.

use http::{header, HeaderValue, Response, StatusCode};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::error::Error;

/// Converts `value` into a header value, rejecting control characters.
pub fn header_safe(value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(Error::from)
}

/// Builds a redirect to `location`.
///
/// # Errors
///
/// Fails when `status` is not a 3xx code or `location` is not a valid
/// header value.
///
/// # Examples
///
/// ```
/// use http::{header, StatusCode};
/// use request_guard::redirect;
///
/// let response = redirect("/login?next=%2F", StatusCode::SEE_OTHER).unwrap();
/// assert_eq!(response.status(), StatusCode::SEE_OTHER);
/// assert_eq!(response.headers()[header::LOCATION], "/login?next=%2F");
///
/// assert!(redirect("/", StatusCode::OK).is_err());
/// assert!(redirect("/\r\nSet-Cookie: a=b", StatusCode::FOUND).is_err());
/// ```
pub fn redirect(location: &str, status: StatusCode) -> Result<Response<Vec<u8>>, Error> {
    if !status.is_redirection() {
        return Err(Error::InvalidRedirectStatus(status.as_u16()));
    }

    let response = Response::builder()
        .status(status)
        .header(header::LOCATION, header_safe(location)?)
        .body(Vec::new())?;

    Ok(response)
}

/// `302 Found` redirect.
pub fn redirect_found(location: &str) -> Result<Response<Vec<u8>>, Error> {
    redirect(location, StatusCode::FOUND)
}

/// Builds a response that makes the browser download `content` as `file_name`.
///
/// Without an explicit `mime`, the type is guessed from the file extension
/// and falls back to `application/octet-stream`.
pub fn send_file(
    file_name: &str,
    content: Vec<u8>,
    mime: Option<&str>,
) -> Result<Response<Vec<u8>>, Error> {
    let content_type = match mime {
        Some(mime) => header_safe(mime)?,
        None => header_safe(
            mime_guess::from_path(file_name)
                .first_or_octet_stream()
                .essence_str(),
        )?,
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition(file_name)?)
        .header(header::CONTENT_LENGTH, content.len())
        .header(header::PRAGMA, "public")
        .header(header::EXPIRES, "0")
        .header(header::CACHE_CONTROL, "must-revalidate")
        .body(content)?;

    Ok(response)
}

fn content_disposition(file_name: &str) -> Result<HeaderValue, Error> {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    let value = if file_name.is_ascii() && fallback == file_name {
        format!("attachment; filename=\"{fallback}\"")
    } else {
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            utf8_percent_encode(file_name, NON_ALPHANUMERIC)
        )
    };

    header_safe(&value)
}
