//! KML path and boundary loading.
//!
//! Only coordinate geometry is read: every `LineString` (and `LinearRing`,
//! as written by tools that export polygons) becomes one list of points.
//! Elements are matched by local name, so the KML 2.2 namespace prefix does
//! not matter. A tuple's altitude is checked to be a number but dropped: it is
//! in the file's own reference and terrain comes from the elevation service.

use crate::error::KmlError;
use crate::models::GeoPoint;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use xmltree::{Element, XMLNode};

pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

const GEOMETRY_ELEMENTS: [&str; 2] = ["LineString", "LinearRing"];

/// Parse every coordinate list in a KML document, in document order.
pub fn parse_kml(text: &str) -> Result<Vec<Vec<GeoPoint>>, KmlError> {
    let root = Element::parse(text.as_bytes()).map_err(|err| KmlError::Parse(err.to_string()))?;
    if let Some(ns) = root.namespace.as_deref() {
        if ns != KML_NAMESPACE {
            tracing::debug!(namespace = ns, "KML document uses a non-standard namespace");
        }
    }

    let mut lines = Vec::new();
    collect_lines(&root, &mut lines)?;
    if lines.is_empty() {
        return Err(KmlError::MissingLineString);
    }
    Ok(lines)
}

/// Read a KML file and return its first coordinate list.
pub fn load_kml_path(path: &Path) -> Result<Vec<GeoPoint>, KmlError> {
    let file = File::open(path)?;
    let root = Element::parse(BufReader::new(file)).map_err(|err| KmlError::Parse(err.to_string()))?;
    let mut lines = Vec::new();
    collect_lines(&root, &mut lines)?;
    let first = lines.into_iter().next().ok_or(KmlError::MissingLineString)?;
    tracing::debug!(path = %path.display(), points = first.len(), "Loaded KML path");
    Ok(first)
}

fn collect_lines(element: &Element, out: &mut Vec<Vec<GeoPoint>>) -> Result<(), KmlError> {
    if GEOMETRY_ELEMENTS.contains(&element.name.as_str()) {
        if let Some(coords) = element.get_child("coordinates") {
            let text = coords.get_text().unwrap_or_default();
            let points = parse_coordinates(&text)?;
            if !points.is_empty() {
                out.push(points);
            }
        }
        return Ok(());
    }
    for child in &element.children {
        if let XMLNode::Element(child) = child {
            collect_lines(child, out)?;
        }
    }
    Ok(())
}

/// Parse whitespace-separated `lon,lat[,alt]` tuples.
pub fn parse_coordinates(text: &str) -> Result<Vec<GeoPoint>, KmlError> {
    text.split_whitespace().map(parse_tuple).collect()
}

fn parse_tuple(tuple: &str) -> Result<GeoPoint, KmlError> {
    let bad = |reason: &str| KmlError::Coordinate {
        tuple: tuple.to_string(),
        reason: reason.to_string(),
    };

    let mut fields = tuple.split(',');
    let lon: f64 = fields
        .next()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| bad("longitude is not a number"))?;
    let lat: f64 = fields
        .next()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| bad("latitude is not a number"))?;
    if let Some(alt) = fields.next() {
        alt.trim()
            .parse::<f64>()
            .map_err(|_| bad("altitude is not a number"))?;
    }

    GeoPoint::new(lat, lon).map_err(|err| bad(&err.reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <name>Route</name>
      <LineString>
        <coordinates>
          -105.0,40.0,0 -105.0,40.005,0
          -104.995,40.01,12.5
        </coordinates>
      </LineString>
    </Placemark>
    <Placemark>
      <Polygon><outerBoundaryIs><LinearRing>
        <coordinates>-105,40 -104.99,40 -104.99,40.01 -105,40</coordinates>
      </LinearRing></outerBoundaryIs></Polygon>
    </Placemark>
  </Document>
</kml>"#;

    #[test]
    fn reads_line_strings_in_order() {
        let lines = parse_kml(SAMPLE).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 3);
        assert_eq!(lines[0][0], GeoPoint::at(40.0, -105.0));
        assert!(lines.iter().flatten().all(|p| p.elevation_m.is_none()));
        assert_eq!(lines[1].len(), 4);
    }

    #[test]
    fn missing_geometry_is_an_error() {
        let doc = r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document/></kml>"#;
        assert!(matches!(parse_kml(doc), Err(KmlError::MissingLineString)));
    }

    #[test]
    fn bad_tuple_is_reported() {
        let err = parse_coordinates("-105,40 north,40").unwrap_err();
        assert!(matches!(err, KmlError::Coordinate { .. }));
        assert!(parse_coordinates("-105,95").is_err());
        assert!(parse_coordinates("-105,40,high").is_err());
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        assert!(matches!(parse_kml("<kml><Document>"), Err(KmlError::Parse(_))));
    }
}
