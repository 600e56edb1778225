//! NETCONF message building and reply parsing

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

use nexus_cfgmgr_common::{ReplyElement, Response, TransportError, TransportResult};

/// NETCONF base namespace
pub const NETCONF_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// NETCONF 1.0 base capability
pub const BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";

/// NX-OS exec-command namespace
pub const NXOS_EXEC_NS: &str = "http://www.cisco.com/nxos:1.0";

/// Client hello advertising base:1.0 only, so the server keeps EOM framing
pub fn client_hello() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><hello xmlns="{}"><capabilities><capability>{}</capability></capabilities></hello>"#,
        NETCONF_NS, BASE_1_0
    )
}

/// RPC running `commands` as one NX-OS exec-command
pub fn exec_command(message_id: u64, commands: &[String]) -> String {
    let cmds: String = commands
        .iter()
        .map(|c| format!("<nxos:cmd>{}</nxos:cmd>", escape(c.as_str())))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rpc message-id="{}" xmlns="{}" xmlns:nxos="{}"><nxos:exec-command>{}</nxos:exec-command></rpc>"#,
        message_id, NETCONF_NS, NXOS_EXEC_NS, cmds
    )
}

pub fn close_session(message_id: u64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rpc message-id="{}" xmlns="{}"><close-session/></rpc>"#,
        message_id, NETCONF_NS
    )
}

fn malformed(e: impl std::fmt::Display) -> TransportError {
    TransportError::Protocol(format!("malformed XML: {}", e))
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Server hello contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub session_id: Option<String>,
    pub capabilities: Vec<String>,
}

/// Parses the server hello and checks it speaks base:1.0
pub fn parse_hello(xml: &str) -> TransportResult<ServerHello> {
    let mut reader = Reader::from_str(xml);
    let mut path: Vec<String> = Vec::new();
    let mut saw_hello = false;
    let mut session_id = None;
    let mut capabilities = Vec::new();

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                let name = local_name(&e);
                if path.is_empty() {
                    saw_hello = name == "hello";
                }
                path.push(name);
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(malformed)?;
                match path.last().map(String::as_str) {
                    Some("capability") => capabilities.push(text.trim().to_string()),
                    Some("session-id") => session_id = Some(text.trim().to_string()),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_hello {
        return Err(TransportError::Protocol(
            "expected <hello> from server".to_string(),
        ));
    }
    if !capabilities.iter().any(|c| c == BASE_1_0) {
        return Err(TransportError::Protocol(format!(
            "server does not support {}",
            BASE_1_0
        )));
    }

    Ok(ServerHello {
        session_id,
        capabilities,
    })
}

#[derive(Default)]
struct RpcError {
    tag: String,
    severity: String,
    message: String,
}

/// Parses an `<rpc-reply>` into its child elements
///
/// Error-severity `<rpc-error>` elements fail the whole reply. Warnings are
/// logged and dropped.
pub fn parse_reply(xml: &str) -> TransportResult<Response> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut saw_reply = false;
    let mut elements = Vec::new();
    let mut current: Option<ReplyElement> = None;
    let mut error: Option<RpcError> = None;
    let mut error_field: Option<String> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                depth += 1;
                let name = local_name(&e);
                match depth {
                    1 => saw_reply = name == "rpc-reply",
                    2 => {
                        if name == "rpc-error" {
                            error = Some(RpcError::default());
                        }
                        current = Some(ReplyElement::new(name, ""));
                    }
                    3 if error.is_some() => error_field = Some(name),
                    _ => {}
                }
            }
            Event::Empty(e) => match depth {
                0 => saw_reply = local_name(&e) == "rpc-reply",
                1 => elements.push(ReplyElement::new(local_name(&e), "")),
                _ => {}
            },
            Event::End(_) => {
                match depth {
                    2 => {
                        if let Some(rpc_error) = error.take() {
                            if rpc_error.severity == "warning" {
                                warn!(
                                    tag = %rpc_error.tag,
                                    "Device warning: {}",
                                    rpc_error.message.trim()
                                );
                                current = None;
                            } else {
                                return Err(TransportError::Rpc {
                                    tag: rpc_error.tag,
                                    message: rpc_error.message.trim().to_string(),
                                });
                            }
                        }
                        elements.extend(current.take());
                    }
                    3 => error_field = None,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) if depth >= 2 => {
                let text = t.unescape().map_err(malformed)?;
                append_text(&mut current, &mut error, error_field.as_deref(), depth, &text);
            }
            Event::CData(c) if depth >= 2 => {
                let text = String::from_utf8_lossy(&c).into_owned();
                append_text(&mut current, &mut error, error_field.as_deref(), depth, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_reply {
        return Err(TransportError::Protocol(
            "expected <rpc-reply> from server".to_string(),
        ));
    }
    Ok(Response::new(elements))
}

fn append_text(
    current: &mut Option<ReplyElement>,
    error: &mut Option<RpcError>,
    field: Option<&str>,
    depth: usize,
    text: &str,
) {
    if let Some(element) = current.as_mut() {
        element.text.push_str(text);
    }
    if let (Some(rpc_error), 3) = (error.as_mut(), depth) {
        match field {
            Some("error-tag") => rpc_error.tag.push_str(text.trim()),
            Some("error-severity") => rpc_error.severity.push_str(text.trim()),
            Some("error-message") => rpc_error.message.push_str(text),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exec_command_escapes() {
        let rpc = exec_command(
            7,
            &[
                "configure terminal".to_string(),
                "description a<b>&c".to_string(),
            ],
        );
        assert!(rpc.contains(r#"message-id="7""#));
        assert!(rpc.contains("<nxos:cmd>configure terminal</nxos:cmd>"));
        assert!(rpc.contains("<nxos:cmd>description a&lt;b&gt;&amp;c</nxos:cmd>"));
    }

    #[test]
    fn test_client_hello_advertises_base() {
        let hello = client_hello();
        assert!(hello.contains(BASE_1_0));
        assert!(!hello.contains("base:1.1"));
    }

    #[test]
    fn test_parse_hello() {
        let hello = parse_hello(
            r#"<?xml version="1.0"?>
<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <capabilities>
    <capability>urn:ietf:params:netconf:base:1.0</capability>
    <capability>urn:ietf:params:netconf:capability:startup:1.0</capability>
  </capabilities>
  <session-id>25241</session-id>
</hello>"#,
        )
        .unwrap();
        assert_eq!(hello.session_id.as_deref(), Some("25241"));
        assert_eq!(hello.capabilities.len(), 2);
    }

    #[test]
    fn test_parse_hello_requires_base() {
        let err = parse_hello(
            "<hello><capabilities><capability>urn:x</capability></capabilities></hello>",
        )
        .unwrap_err();
        assert!(err.to_string().contains("base:1.0"));

        assert!(parse_hello("<rpc-reply/>").is_err());
    }

    #[test]
    fn test_parse_data_reply() {
        let reply = parse_reply(
            r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<nf:rpc-reply xmlns:nf="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="1">
<nf:data>
!Command: show running-config interface Ethernet1/20
interface Ethernet1/20
  description host-42
</nf:data>
</nf:rpc-reply>"#,
        )
        .unwrap();

        assert_eq!(reply.elements().len(), 1);
        assert_eq!(reply.elements()[0].name, "data");
        assert!(reply.payload().unwrap().contains("  description host-42\n"));
    }

    #[test]
    fn test_parse_ok_reply() {
        let reply = parse_reply(
            r#"<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="2"><ok/></rpc-reply>"#,
        )
        .unwrap();
        assert_eq!(reply.elements(), &[ReplyElement::new("ok", "")]);
    }

    #[test]
    fn test_parse_rpc_error() {
        let err = parse_reply(
            r#"<rpc-reply message-id="3">
  <rpc-error>
    <error-type>application</error-type>
    <error-tag>invalid-value</error-tag>
    <error-severity>error</error-severity>
    <error-message xml:lang="en">Syntax error while parsing 'bogus'</error-message>
  </rpc-error>
</rpc-reply>"#,
        )
        .unwrap_err();

        match err {
            TransportError::Rpc { tag, message } => {
                assert_eq!(tag, "invalid-value");
                assert_eq!(message, "Syntax error while parsing 'bogus'");
            }
            other => panic!("Expected Rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rpc_warning_is_dropped() {
        let reply = parse_reply(
            r#"<rpc-reply><rpc-error><error-tag>x</error-tag><error-severity>warning</error-severity></rpc-error><ok/></rpc-reply>"#,
        )
        .unwrap();
        assert_eq!(reply.elements(), &[ReplyElement::new("ok", "")]);
    }

    #[test]
    fn test_parse_multiple_elements() {
        let reply = parse_reply("<rpc-reply><data>a</data><data>b</data></rpc-reply>").unwrap();
        assert_eq!(reply.elements().len(), 2);
        assert!(reply.payload().is_err());
    }

    #[test]
    fn test_parse_rejects_non_reply() {
        assert!(parse_reply("<hello/>").is_err());
        assert!(parse_reply("not xml at all").is_err());
    }
}
