//! Read-only queries against NETCONF response documents.

use std::path::Path;

use log::warn;

/// NETCONF base namespace.
pub const XMLNS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Extract an operation status from a response body.
///
/// Returns `"OK"` when the reply contains an `<ok/>` element,
/// `"<SEVERITY>: <tag>"` for a well-formed `<rpc-error>`, `"?"` when the
/// reply has neither (or the error is missing its detail elements), and
/// `""` when there was no parseable document at all.
pub fn status_of(body: Option<&str>) -> String {
    let Some(body) = body else {
        return String::new();
    };
    let Ok(doc) = roxmltree::Document::parse(body) else {
        return String::new();
    };
    let root = doc.root_element();

    if root
        .children()
        .any(|n| n.is_element() && n.tag_name().name() == "ok")
    {
        return "OK".to_string();
    }

    let Some(error) = root
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "rpc-error")
    else {
        return "?".to_string();
    };
    let detail = |name: &str| {
        error
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == name)
            .and_then(|n| n.text())
            .map(str::trim)
    };
    match (detail("error-severity"), detail("error-tag")) {
        (Some(severity), Some(tag)) => format!("{}: {}", severity.to_uppercase(), tag),
        _ => "?".to_string(),
    }
}

/// Text of the first element anywhere in the tree whose local tag name
/// matches, namespace prefixes ignored.
pub fn find_text(body: &str, local_name: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(body).ok()?;
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == local_name)
        .and_then(|n| n.text())
        .map(str::to_string)
}

/// [`find_text`] against a persisted response file.
pub fn find_text_in_file(path: &Path, local_name: &str) -> Option<String> {
    let body = std::fs::read_to_string(path)
        .map_err(|e| warn!("reading response file {} failed - {e}", path.display()))
        .ok()?;
    find_text(&body, local_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_REPLY: &str = r#"<?xml version="1.0"?>
<rpc-reply message-id="1700000000" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
<ok/>
</rpc-reply>"#;

    const ERROR_REPLY: &str = r#"<?xml version="1.0"?>
<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
<rpc-error>
<error-type>application</error-type>
<error-tag>operation-failed</error-tag>
<error-severity>error</error-severity>
<error-message>commit failed</error-message>
</rpc-error>
</rpc-reply>"#;

    #[test]
    fn ok_reply_is_ok() {
        assert_eq!(status_of(Some(OK_REPLY)), "OK");
    }

    #[test]
    fn rpc_error_yields_severity_and_tag() {
        assert_eq!(status_of(Some(ERROR_REPLY)), "ERROR: operation-failed");
    }

    #[test]
    fn missing_document_is_empty_status() {
        assert_eq!(status_of(None), "");
        assert_eq!(status_of(Some("not xml <<<")), "");
    }

    #[test]
    fn unrecognized_reply_shape_is_question_mark() {
        let reply = r#"<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><data/></rpc-reply>"#;
        assert_eq!(status_of(Some(reply)), "?");

        let bare_error = r#"<rpc-reply><rpc-error/></rpc-reply>"#;
        assert_eq!(status_of(Some(bare_error)), "?");
    }

    #[test]
    fn find_text_ignores_namespace_prefix() {
        let hello = r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
<capabilities><capability>urn:ietf:params:netconf:base:1.1</capability></capabilities>
<session-id>3832</session-id>
</hello>"#;
        assert_eq!(find_text(hello, "session-id").as_deref(), Some("3832"));
        assert_eq!(find_text(hello, "no-such-tag"), None);
    }

    #[test]
    fn find_text_reaches_nested_elements() {
        let reply = r#"<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
<data><system><host-name>host.domain</host-name></system></data>
</rpc-reply>"#;
        assert_eq!(find_text(reply, "host-name").as_deref(), Some("host.domain"));
    }
}
