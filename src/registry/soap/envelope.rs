//! SOAP 1.1 envelopes for the TERYT web service (TerytWs1).

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;

pub const SERVICE_NAMESPACE: &str = "http://tempuri.org/";
const SERVICE_CONTRACT: &str = "ITerytWs1";
const SOAP_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const WSSE_NAMESPACE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const PASSWORD_TEXT: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

/// One record of a list response: leaf element name (lowercased) -> text.
pub type Record = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("SOAP fault: {0}")]
    Fault(String),
    #[error("malformed SOAP response: {0}")]
    Malformed(String),
}

/// Credentials for the WS-Security UsernameToken header.
#[derive(Debug, Clone)]
pub struct SoapCredentials {
    pub username: String,
    pub password: String,
}

/// SOAPAction header value for an operation.
pub fn soap_action(operation: &str) -> String {
    format!("{}{}/{}", SERVICE_NAMESPACE, SERVICE_CONTRACT, operation)
}

/// Build a request envelope for `operation` with the given parameters.
pub fn build_envelope(
    operation: &str,
    params: &[(&str, String)],
    credentials: Option<&SoapCredentials>,
) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(&format!(
        r#"<soapenv:Envelope xmlns:soapenv="{}" xmlns:tem="{}">"#,
        SOAP_NAMESPACE, SERVICE_NAMESPACE
    ));

    xml.push_str("<soapenv:Header>");
    if let Some(creds) = credentials {
        xml.push_str(&format!(
            concat!(
                r#"<wsse:Security xmlns:wsse="{}"><wsse:UsernameToken>"#,
                "<wsse:Username>{}</wsse:Username>",
                r#"<wsse:Password Type="{}">{}</wsse:Password>"#,
                "</wsse:UsernameToken></wsse:Security>"
            ),
            WSSE_NAMESPACE,
            escape(creds.username.as_str()),
            PASSWORD_TEXT,
            escape(creds.password.as_str())
        ));
    }
    xml.push_str("</soapenv:Header>");

    xml.push_str(&format!("<soapenv:Body><tem:{}>", operation));
    for (name, value) in params {
        xml.push_str(&format!("<tem:{0}>{1}</tem:{0}>", name, escape(value.as_str())));
    }
    xml.push_str(&format!("</tem:{}></soapenv:Body></soapenv:Envelope>", operation));
    xml
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Parse the records of `<{operation}Result>` out of a response envelope.
///
/// Every direct child of the result element is one record; the leaf elements
/// inside it become its fields, keyed by lowercased local name.
pub fn parse_records(xml: &str, operation: &str) -> Result<Vec<Record>, EnvelopeError> {
    let result_tag = format!("{}Result", operation);
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut seen_result = false;
    let mut in_result = false;
    // Depth below the result element: 1 = record, 2+ = fields
    let mut depth = 0usize;
    let mut current: Option<Record> = None;
    let mut field: Option<String> = None;

    let mut in_fault = false;
    let mut fault_field: Option<String> = None;
    let mut fault_message: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| EnvelopeError::Malformed(e.to_string()))?;

        match event {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref());
                if in_result {
                    depth += 1;
                    if depth == 1 {
                        current = Some(Record::new());
                    } else {
                        field = Some(name.to_lowercase());
                    }
                } else if name == result_tag {
                    seen_result = true;
                    in_result = true;
                    depth = 0;
                } else if name == "Fault" {
                    in_fault = true;
                } else if in_fault {
                    fault_field = Some(name);
                }
            }
            Event::Empty(e) => {
                let name = local_name(e.local_name().as_ref());
                if in_result {
                    if depth == 0 {
                        records.push(Record::new());
                    } else if let Some(record) = current.as_mut() {
                        record.insert(name.to_lowercase(), String::new());
                    }
                } else if name == result_tag {
                    seen_result = true;
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
                if in_result {
                    if let (Some(record), Some(name)) = (current.as_mut(), field.as_ref()) {
                        record.insert(name.clone(), text.trim().to_string());
                    }
                } else if in_fault {
                    // SOAP 1.1 <faultstring>, SOAP 1.2 <Reason><Text>
                    if matches!(fault_field.as_deref(), Some("faultstring") | Some("Text")) {
                        fault_message = Some(text.trim().to_string());
                    }
                }
            }
            Event::CData(c) => {
                if let (true, Some(record), Some(name)) = (in_result, current.as_mut(), field.as_ref())
                {
                    let text = String::from_utf8_lossy(&c.into_inner()).trim().to_string();
                    record.insert(name.clone(), text);
                }
            }
            Event::End(e) => {
                if in_result {
                    if depth == 0 {
                        in_result = false;
                    } else {
                        depth -= 1;
                        if depth == 0 {
                            if let Some(record) = current.take() {
                                records.push(record);
                            }
                        }
                        field = None;
                    }
                } else if local_name(e.local_name().as_ref()) == "Fault" {
                    in_fault = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(message) = fault_message {
        return Err(EnvelopeError::Fault(message));
    }
    if !seen_result {
        return Err(EnvelopeError::Malformed(format!(
            "no <{}> element in response",
            result_tag
        )));
    }
    Ok(records)
}
