//! Line-delimited wire protocol for the account service.
//!
//! Requests and responses travel as one JSON-shaped line per message. The
//! decoder is deliberately tolerant: values are pulled out by field marker
//! rather than by parsing a full document, a missing field becomes an
//! absent value, and an unrecognized action still decodes successfully
//! (the dispatcher produces the user-facing error). The encoder escapes
//! every embedded string value, so a username or email containing quotes
//! or backslashes cannot corrupt the framing.

use std::collections::HashMap;

use crate::types::{Action, Data, Request, Response, Status, User, UserInfo};

/// Field keys the decoder looks for inside a request's data object.
const REQUEST_FIELDS: [&str; 4] = ["username", "password", "email", "userId"];

const ARRAY_MARKER: &str = "\"data\":[";

/// Decode one request line, already stripped of its terminator.
pub fn decode_request(line: &str) -> Request {
    let action = detect_action(line);

    let mut fields = HashMap::new();
    for key in REQUEST_FIELDS {
        if let Some(value) = extract_field(line, key) {
            fields.insert(key.to_string(), value);
        }
    }

    Request { action, fields }
}

fn detect_action(line: &str) -> Action {
    for action in [
        Action::Register,
        Action::Login,
        Action::GetUserList,
        Action::DeleteUser,
        Action::GetUserByUsername,
        Action::UpdateUser,
    ] {
        let marker = format!("\"action\":\"{}\"", action.wire_name());
        if line.contains(&marker) {
            return action;
        }
    }
    Action::Unknown
}

/// Extract a named field's value from a line.
///
/// Locates the `"key":` marker and reads either a quoted string,
/// terminated by the next unescaped quote and then unescaped, or a bare
/// token running up to the next `,`, `}` or `]`, trimmed. Returns `None`
/// when the marker is absent or the value is empty or unterminated.
pub fn extract_field(line: &str, key: &str) -> Option<String> {
    let marker = format!("\"{}\":", key);
    let start = line.find(&marker)? + marker.len();
    let rest = line[start..].trim_start();

    if let Some(quoted) = rest.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = quoted.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('u') => {
                        let code: String = chars.by_ref().take(4).collect();
                        if let Some(decoded) =
                            u32::from_str_radix(&code, 16).ok().and_then(char::from_u32)
                        {
                            value.push(decoded);
                        }
                    }
                    Some(escaped) => value.push(unescape_char(escaped)),
                    None => return None,
                }
            } else if c == '"' {
                return Some(value);
            } else {
                value.push(c);
            }
        }
        // Unterminated string value.
        None
    } else {
        let end = rest.find([',', '}', ']']).unwrap_or(rest.len());
        let value = rest[..end].trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

fn unescape_char(escaped: char) -> char {
    match escaped {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'b' => '\u{0008}',
        'f' => '\u{000c}',
        other => other,
    }
}

/// Escape a string value for embedding between quotes on the wire.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// Split the `"data":[...]` array of a response line into its objects.
///
/// Scans character by character, tracking string state (toggled by
/// unescaped quotes) and brace depth; an object is complete when the depth
/// returns to zero outside a string. Flat objects only. Scanning stops at
/// the first unescaped `]` at depth zero.
pub fn decode_object_array(line: &str) -> Vec<String> {
    let Some(start) = line.find(ARRAY_MARKER) else {
        return Vec::new();
    };
    let body = &line[start + ARRAY_MARKER.len()..];

    let mut objects = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for c in body.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == '"' {
            current.push(c);
            in_string = !in_string;
        } else if in_string {
            current.push(c);
        } else {
            match c {
                '{' => {
                    depth += 1;
                    current.push(c);
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                    if depth == 0 {
                        objects.push(std::mem::take(&mut current));
                    }
                }
                ']' if depth == 0 => break,
                ',' | ' ' | '\n' | '\r' | '\t' if depth == 0 => {}
                other => current.push(other),
            }
        }
    }

    objects
}

/// Decode one flat user object into its wire fields.
pub fn decode_user(obj: &str) -> UserInfo {
    UserInfo {
        id: extract_field(obj, "id")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        username: extract_field(obj, "username").unwrap_or_default(),
        email: extract_field(obj, "email").unwrap_or_default(),
        password: extract_field(obj, "password").unwrap_or_default(),
        created_at: extract_field(obj, "createdAt").unwrap_or_default(),
    }
}

/// Check a response line for success status.
pub fn is_success(line: &str) -> bool {
    line.contains("\"status\":\"success\"")
}

/// Encode a response as one newline-terminated line.
pub fn encode_response(response: &Response) -> String {
    let mut out = String::from("{\"status\":\"");
    out.push_str(match response.status {
        Status::Success => "success",
        Status::Error => "error",
    });
    out.push('"');

    if let Some(message) = &response.message {
        out.push_str(",\"message\":\"");
        out.push_str(&escape(message));
        out.push('"');
    }

    match &response.data {
        Some(Data::Account(user)) => {
            out.push_str(",\"data\":");
            out.push_str(&encode_account(user));
        }
        Some(Data::AccountList(users)) => {
            out.push_str(",\"data\":[");
            for (i, user) in users.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&encode_account(user));
            }
            out.push(']');
        }
        Some(Data::Profile(user)) => {
            out.push_str(",\"data\":");
            out.push_str(&encode_profile(user));
        }
        None => {}
    }

    out.push_str("}\n");
    out
}

fn encode_account(user: &User) -> String {
    format!(
        "{{\"id\":{},\"username\":\"{}\",\"email\":\"{}\",\"password\":\"{}\",\"createdAt\":\"{}\"}}",
        user.id,
        escape(&user.username),
        escape(user.email.as_deref().unwrap_or("")),
        escape(&user.password_record),
        escape(&user.created_at.to_rfc3339()),
    )
}

fn encode_profile(user: &User) -> String {
    format!(
        "{{\"id\":{},\"username\":\"{}\",\"email\":\"{}\"}}",
        user.id,
        escape(&user.username),
        escape(user.email.as_deref().unwrap_or("")),
    )
}

/// Encode a request line for the given action and data fields.
///
/// The data object is omitted entirely when no fields are given, as for
/// `getUserList`.
pub fn encode_request(action: Action, fields: &[(&str, &str)]) -> String {
    let mut out = format!("{{\"action\":\"{}\"", action.wire_name());
    if !fields.is_empty() {
        out.push_str(",\"data\":{");
        for (i, (key, value)) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push('"');
            out.push_str(key);
            out.push_str("\":\"");
            out.push_str(&escape(value));
            out.push('"');
        }
        out.push('}');
    }
    out.push_str("}\n");
    out
}
