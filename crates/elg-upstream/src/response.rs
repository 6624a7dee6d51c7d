use quick_xml::events::Event;
use quick_xml::Reader;

use elg_common::GatewayError;

/// Strip the first `xmlns="..."` attribute from `xml` so the default
/// namespace doesn't need to be threaded through every element lookup.
///
/// This mirrors the one documented fragility of the upstream contract: it
/// only strips the *first* occurrence, so a response that redeclares the
/// default namespace on a nested element would still carry it.
fn strip_first_default_namespace(xml: &str) -> String {
    const NEEDLE: &str = " xmlns=\"";

    let Some(start) = xml.find(NEEDLE) else {
        return xml.to_string();
    };

    let after_needle = start + NEEDLE.len();
    let Some(end_offset) = xml[after_needle..].find('"') else {
        return xml.to_string();
    };
    let end = after_needle + end_offset + 1;

    let mut out = String::with_capacity(xml.len() - (end - start));
    out.push_str(&xml[..start]);
    out.push_str(&xml[end..]);
    out
}

/// Parse an upstream `LocationRS` XML response into `(lat, lon, hpe)`.
pub fn parse_response_xml(body: &[u8]) -> Result<(f64, f64, f64), GatewayError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| GatewayError::MalformedUpstreamResponse(format!("response is not UTF-8: {e}")))?
        .trim();

    let stripped = strip_first_default_namespace(text);

    let mut reader = Reader::from_str(&stripped);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;
    let mut hpe: Option<f64> = None;

    loop {
        match reader.read_event().map_err(|e| {
            GatewayError::MalformedUpstreamResponse(format!("XML parse error: {e}"))
        })? {
            Event::Start(tag) => {
                path.push(String::from_utf8_lossy(tag.local_name().as_ref()).into_owned());
            }
            Event::Empty(tag) => {
                // Self-closing element: push and immediately pop, it has no
                // text content to capture.
                path.push(String::from_utf8_lossy(tag.local_name().as_ref()).into_owned());
                path.pop();
            }
            Event::Text(text_event) => {
                let value = text_event.unescape().map_err(|e| {
                    GatewayError::MalformedUpstreamResponse(format!("unescaping text: {e}"))
                })?;

                if matches!(path.as_slice(), [.., a, b] if a == "location" && b == "latitude") {
                    lat = Some(parse_f64(&value)?);
                } else if matches!(path.as_slice(), [.., a, b] if a == "location" && b == "longitude")
                {
                    lon = Some(parse_f64(&value)?);
                } else if matches!(path.as_slice(), [.., a, b] if a == "location" && b == "hpe") {
                    hpe = Some(parse_f64(&value)?);
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let lat = lat.ok_or_else(|| {
        GatewayError::MalformedUpstreamResponse("missing location/latitude".into())
    })?;
    let lon = lon.ok_or_else(|| {
        GatewayError::MalformedUpstreamResponse("missing location/longitude".into())
    })?;
    let hpe = hpe
        .ok_or_else(|| GatewayError::MalformedUpstreamResponse("missing location/hpe".into()))?;

    Ok((lat, lon, hpe))
}

fn parse_f64(value: &str) -> Result<f64, GatewayError> {
    value.trim().parse::<f64>().map_err(|e| {
        GatewayError::MalformedUpstreamResponse(format!("cannot parse '{value}' as f64: {e}"))
    })
}
