//! Presentation: marker encoding, map markup, result tables.

use crate::error::{RecommendError, Result};
use crate::geocoder::PlaceLocation;
use crate::pipeline::RankedResult;
use serde::Serialize;
use std::fmt::Write;

/// Initial map center (Seoul City Hall) before bounds are fitted.
pub const MAP_CENTER: (f64, f64) = (37.5665, 126.9780);
pub const MAP_ZOOM: u8 = 12;

/// Marker radius at normalized similarity 0; similarity 1 adds `MARKER_SCALE_RANGE`.
pub const MARKER_BASE_SCALE: f32 = 10.0;
pub const MARKER_SCALE_RANGE: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub fn css(&self) -> String {
        format!("rgb({}, {}, {})", self.red, self.green, self.blue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub color: Rgb,
    pub scale: f32,
}

/// Red for the least similar result, green for the most similar, larger
/// markers for closer matches.
pub fn marker_style(normalized_similarity: f32) -> MarkerStyle {
    let s = normalized_similarity.clamp(0.0, 1.0);
    MarkerStyle {
        color: Rgb {
            red: ((1.0 - s) * 255.0).floor() as u8,
            green: (s * 255.0).floor() as u8,
            blue: 0,
        },
        scale: MARKER_BASE_SCALE + s * MARKER_SCALE_RANGE,
    }
}

/// Percentage with two decimals, e.g. `80.00%`.
pub fn similarity_label(normalized_similarity: f32) -> String {
    format!("{:.2}%", normalized_similarity * 100.0)
}

#[derive(Serialize)]
struct MarkerPayload<'a> {
    name: &'a str,
    address: &'a str,
    review_text: &'a str,
    similarity: String,
    latitude: f64,
    longitude: f64,
    color: String,
    scale: f32,
}

/// Map `<div>` plus the scripts that populate it, or None when there is
/// nothing to plot.
pub fn map_fragment(locations: &[PlaceLocation], api_key: &str) -> Result<Option<String>> {
    if locations.is_empty() {
        return Ok(None);
    }

    let markers: Vec<MarkerPayload> = locations
        .iter()
        .map(|l| {
            let style = marker_style(l.result.normalized_similarity);
            MarkerPayload {
                name: &l.result.name,
                address: &l.result.address,
                review_text: &l.result.review_text,
                similarity: similarity_label(l.result.normalized_similarity),
                latitude: l.coordinates.latitude,
                longitude: l.coordinates.longitude,
                color: style.color.css(),
                scale: style.scale,
            }
        })
        .collect();

    // `</` would close the script element early.
    let data = serde_json::to_string(&markers)
        .map_err(|e| RecommendError::SerializationError(e.to_string()))?
        .replace("</", "<\\/");

    Ok(Some(format!(
        r##"<div id="map" style="width: 100%; height: 500px;"></div>
<script>
  function initMap() {{
    const map = new google.maps.Map(document.getElementById("map"), {{
      zoom: {zoom},
      center: {{ lat: {lat}, lng: {lng} }}
    }});
    const bounds = new google.maps.LatLngBounds();
    const locations = {data};

    locations.forEach((location) => {{
      const marker = new google.maps.Marker({{
        position: {{ lat: location.latitude, lng: location.longitude }},
        map: map,
        title: location.name,
        icon: {{
          path: google.maps.SymbolPath.CIRCLE,
          scale: location.scale,
          fillColor: location.color,
          fillOpacity: 0.9,
          strokeWeight: 1,
          strokeColor: "#000"
        }}
      }});

      const content = document.createElement("div");
      content.style.maxWidth = "200px";
      const lines = [
        ["h3", location.name],
        ["p", "Address: " + location.address],
        ["p", "Review: " + location.review_text],
        ["p", "Similarity: " + location.similarity]
      ];
      lines.forEach(([tag, text]) => {{
        const el = document.createElement(tag);
        el.textContent = text;
        content.appendChild(el);
      }});
      const infoWindow = new google.maps.InfoWindow({{ content: content }});
      marker.addListener("click", () => infoWindow.open(map, marker));
      bounds.extend(marker.getPosition());
    }});

    map.fitBounds(bounds);
  }}
</script>
<script async defer src="https://maps.googleapis.com/maps/api/js?key={key}&callback=initMap"></script>"##,
        zoom = MAP_ZOOM,
        lat = MAP_CENTER.0,
        lng = MAP_CENTER.1,
        data = data,
        key = escape_html(api_key),
    )))
}

/// Standalone HTML document with the marker map, or None when no place
/// could be located.
pub fn render_map(locations: &[PlaceLocation], api_key: &str) -> Result<Option<String>> {
    Ok(map_fragment(locations, api_key)?.map(|fragment| {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Recommended places</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            fragment
        )
    }))
}

/// Plain-text table for terminal output.
pub fn render_table(results: &[RankedResult]) -> String {
    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} ({})\n   similarity: {:.4} (normalized {})\n   {}",
            i + 1,
            r.name,
            r.address,
            r.raw_similarity,
            similarity_label(r.normalized_similarity),
            r.review_text
        );
    }
    out
}

/// Search form page.
pub fn render_search_page() -> String {
    page(
        "Place recommendations",
        r#"<form action="/search" method="get">
  <input type="text" name="q" placeholder="Describe the place you are looking for" size="50" autofocus>
  <button type="submit">Search</button>
</form>"#,
    )
}

/// Results page: ranked table, then the map, or a notice if no place
/// could be located.
pub fn render_results_page(query: &str, results: &[RankedResult], map: Option<&str>) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<form action=\"/search\" method=\"get\"><input type=\"text\" name=\"q\" value=\"{}\" size=\"50\"> <button type=\"submit\">Search</button></form>",
        escape_html(query)
    );

    if results.is_empty() {
        body.push_str("<p>No matching places.</p>\n");
        return page("Place recommendations", &body);
    }

    body.push_str("<h2>Recommended places and reviews</h2>\n<table border=\"1\" cellpadding=\"4\">\n");
    body.push_str("<tr><th>#</th><th>Name</th><th>Address</th><th>Review</th><th>Similarity</th></tr>\n");
    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.4}</td></tr>",
            i + 1,
            escape_html(&r.name),
            escape_html(&r.address),
            escape_html(&r.review_text),
            r.raw_similarity
        );
    }
    body.push_str("</table>\n");

    match map {
        Some(fragment) => {
            body.push_str("<h2>Map</h2>\n");
            body.push_str(fragment);
        }
        None => body.push_str("<p>Could not locate any of the recommended places.</p>\n"),
    }

    page("Place recommendations", &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
        body = body
    )
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
