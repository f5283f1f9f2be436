use std::{net::IpAddr, str::FromStr};

use actix_web::{dev::ServiceRequest, http::header::AUTHORIZATION, HttpRequest};
use log::{debug, trace};
use regex::Regex;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        // The left-most address is the original client
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(forwarded_for)
            .and_then(|s| IpAddr::from_str(&s).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

fn forwarded_for(header: &str) -> Option<String> {
    let re = Regex::new(r#"(?i)for="?\[?(?P<ip>[0-9a-fA-F:.]+)"#).ok()?;
    re.captures(header).and_then(|caps| caps.name("ip")).map(|m| m.as_str().to_string())
}

/// Pulls the access token from the `Authorization: Bearer` header or, failing that, the `token` query parameter.
/// Browsers cannot set headers on an `EventSource`, so notification streams pass the token in the query.
pub fn extract_access_token(req: &ServiceRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| strip_scheme(v, "Bearer"))
        .map(|t| t.to_string());
    from_header.or_else(|| {
        req.query_string()
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == "token")
            .map(|(_, v)| v.to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Strips a case-insensitive authorization scheme, e.g. `Bearer` or `Apikey`, from a header value.
pub fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let (given, rest) = value.trim().split_once(' ')?;
    given.eq_ignore_ascii_case(scheme).then(|| rest.trim()).filter(|s| !s.is_empty())
}
