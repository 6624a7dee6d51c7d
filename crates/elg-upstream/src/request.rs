use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::Writer;

use elg_common::{GatewayError, Rq};

const SCHEMA_LOCATION: &str = "http://skyhookwireless.com/wps/2005 ../../src/xsd/location.xsd";
const NAMESPACE: &str = "http://skyhookwireless.com/wps/2005";

fn xml_error(e: quick_xml::Error) -> GatewayError {
    GatewayError::UpstreamError(format!("building request XML: {e}"))
}

/// Build the UTF-8 XML body of the upstream `LocationRQ` request for `rq`,
/// authenticating with `api_key`.
pub fn build_request_xml(rq: &Rq, api_key: &str) -> Result<Vec<u8>, GatewayError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_error)?;

    let mut root = BytesStart::new("LocationRQ");
    root.push_attribute(("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    root.push_attribute(("xmlns", NAMESPACE));
    root.push_attribute(("version", "2.25"));
    writer.write_event(Event::Start(root)).map_err(xml_error)?;

    let mut auth = BytesStart::new("authentication");
    auth.push_attribute(("version", "2.2"));
    writer.write_event(Event::Start(auth)).map_err(xml_error)?;

    let mut key = BytesStart::new("key");
    key.push_attribute(("key", api_key));
    key.push_attribute(("username", "elg"));
    writer.write_event(Event::Empty(key)).map_err(xml_error)?;

    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("authentication")))
        .map_err(xml_error)?;

    for ap in &rq.aps {
        writer
            .write_event(Event::Start(BytesStart::new("access-point")))
            .map_err(xml_error)?;

        writer
            .write_event(Event::Start(BytesStart::new("mac")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Text(BytesText::new(&format!("{:x}", ap.mac))))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(quick_xml::events::BytesEnd::new("mac")))
            .map_err(xml_error)?;

        writer
            .write_event(Event::Start(BytesStart::new("signal-strength")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Text(BytesText::new(&ap.rssi.to_string())))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(quick_xml::events::BytesEnd::new(
                "signal-strength",
            )))
            .map_err(xml_error)?;

        writer
            .write_event(Event::End(quick_xml::events::BytesEnd::new(
                "access-point",
            )))
            .map_err(xml_error)?;
    }

    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("LocationRQ")))
        .map_err(xml_error)?;

    Ok(writer.into_inner().into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elg_common::ApScan;

    #[test]
    fn includes_access_points_with_lowercase_hex_mac() {
        let rq = Rq {
            aps: vec![
                ApScan {
                    mac: 0x0011223344aa,
                    rssi: -55,
                    channel_number: None,
                },
                ApScan {
                    mac: 0x00aabbccdd11,
                    rssi: -70,
                    channel_number: Some(6),
                },
            ],
        };

        let xml = String::from_utf8(build_request_xml(&rq, "test-api-key").unwrap()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<mac>11223344aa</mac>"));
        assert!(xml.contains("<mac>aabbccdd11</mac>"));
        assert!(xml.contains("<signal-strength>-55</signal-strength>"));
        assert!(xml.contains("key=\"test-api-key\""));
        assert!(xml.contains("username=\"elg\""));
    }

    #[test]
    fn empty_ap_list_still_produces_valid_envelope() {
        let rq = Rq { aps: vec![] };
        let xml = String::from_utf8(build_request_xml(&rq, "k").unwrap()).unwrap();

        assert!(xml.contains("<LocationRQ"));
        assert!(xml.contains("</LocationRQ>"));
        assert!(!xml.contains("access-point"));
    }
}
