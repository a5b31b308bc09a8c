//! Source-table scraping: pull the country list and the Olympic code table
//! out of their wiki pages. Plain string walking, no DOM.

use std::collections::BTreeMap;

use crate::error::PipelineError;

pub const BASE_URL: &str = "https://es.wikipedia.org";
pub const COUNTRY_LIST_PAGE: &str = "/wiki/Anexo:Pa%C3%ADses";
pub const OLYMPIC_CODES_PAGE: &str = "/wiki/Anexo:C%C3%B3digos_del_COI";

// Markers identifying the one useful table on each page
const COUNTRY_TABLE_MARKER: &str = "Forma de gobierno";
const OLYMPIC_TABLE_MARKER: &str = "Federación nacional";

/// One row of the country list table.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRow {
    pub name: String,
    pub url: String,
    pub continent: String,
}

/// Extract the country rows (name, page URL, continent) from the list page.
pub fn parse_country_table(html: &str) -> Result<Vec<CountryRow>, PipelineError> {
    let table = find_marked_table(html, COUNTRY_TABLE_MARKER)?;
    let headers = header_texts(table);
    let name_col = header_index(&headers, "Nombre común")?;
    let url_col = header_index(&headers, "forma oficial")?;
    let continent_col = header_index(&headers, "Continente")?;

    let mut rows = Vec::new();
    let mut pos = 0;
    while let Some((start, end)) = tag_block(table, "tr", pos) {
        let row = &table[start..end];
        pos = end;

        let cells = cell_blocks(row, "td");
        if cells.len() <= name_col.max(url_col).max(continent_col) {
            continue; // header or spacer row
        }

        // The state-name cell links to the country page; skip image and
        // citation links, which carry a namespace colon
        let url = links_in(cells[url_col])
            .into_iter()
            .find(|href| href.starts_with("/wiki/") && !href.contains(':'))
            .map(|href| format!("{}{}", BASE_URL, href))
            .ok_or_else(|| {
                PipelineError::PageStructure(format!(
                    "country row without a page link: {:?}",
                    text_of(cells[url_col])
                ))
            })?;

        rows.push(CountryRow {
            name: text_of(cells[name_col]),
            url,
            continent: text_of(cells[continent_col]),
        });
    }

    Ok(rows)
}

/// Extract the active Olympic codes from the code-table page, keyed by the
/// federation's country page URL. Deprecated codes (with an end date in the
/// "hasta" column) and section-letter rows are skipped.
pub fn parse_olympic_table(html: &str) -> Result<BTreeMap<String, String>, PipelineError> {
    let table = find_marked_table(html, OLYMPIC_TABLE_MARKER)?;
    let headers = header_texts(table);
    let code_col = header_index(&headers, "Código")?;
    let url_col = header_index(&headers, OLYMPIC_TABLE_MARKER)?;
    let until_col = header_index(&headers, "hasta")?;

    let mut codes = BTreeMap::new();
    let mut pos = 0;
    while let Some((start, end)) = tag_block(table, "tr", pos) {
        let row = &table[start..end];
        pos = end;

        if row.contains("<h5") {
            continue; // initial-letter section row
        }

        let cells = cell_blocks(row, "td");
        if cells.len() <= code_col.max(url_col).max(until_col) {
            continue;
        }

        if !text_of(cells[until_col]).is_empty() {
            continue; // deprecated code
        }

        let Some(href) = links_in(cells[url_col]).into_iter().next() else {
            continue;
        };
        let url = format!("{}{}", BASE_URL, href);
        let code = text_of(cells[code_col]);

        if let Some(previous) = codes.insert(url.clone(), code) {
            return Err(PipelineError::PageStructure(format!(
                "duplicate federation URL {} (code {})",
                url, previous
            )));
        }
    }

    Ok(codes)
}

/// First table block whose visible text contains the marker.
fn find_marked_table<'a>(html: &'a str, marker: &str) -> Result<&'a str, PipelineError> {
    let mut pos = 0;
    while let Some((start, end)) = tag_block(html, "table", pos) {
        let table = &html[start..end];
        pos = end;
        if table.contains(marker) {
            return Ok(table);
        }
    }
    Err(PipelineError::PageStructure(format!(
        "no table containing {:?}",
        marker
    )))
}

/// Column titles from the table's first row.
fn header_texts(table: &str) -> Vec<String> {
    match tag_block(table, "tr", 0) {
        Some((start, end)) => cell_blocks(&table[start..end], "th")
            .iter()
            .map(|th| text_of(th))
            .collect(),
        None => Vec::new(),
    }
}

fn header_index(headers: &[String], needle: &str) -> Result<usize, PipelineError> {
    headers
        .iter()
        .position(|h| h.contains(needle))
        .ok_or_else(|| PipelineError::PageStructure(format!("no column header matching {:?}", needle)))
}

/* ---------------- low-level string walking ---------------- */

/// Byte range of the next `<tag ...>...</tag>` block at or after `from`.
/// Closing tag matching is naive (first close wins); good enough for the
/// flat wiki tables this feeds on.
fn tag_block(html: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let rest = html.get(from..)?;
    let rel = rest.find(&open)?;
    let start = from + rel;

    // Reject partial matches like <td> when looking for <t>
    let after = html.as_bytes().get(start + open.len())?;
    if !matches!(after, b' ' | b'>' | b'\n' | b'\t' | b'\r') {
        return tag_block(html, tag, start + open.len());
    }

    let body_start = start + html[start..].find('>')? + 1;
    let close_rel = html[body_start..].find(&close)?;
    let end = body_start + close_rel + close.len();
    Some((start, end))
}

/// All direct `<td>`/`<th>` blocks inside a row or table fragment.
fn cell_blocks<'a>(fragment: &'a str, tag: &str) -> Vec<&'a str> {
    let mut cells = Vec::new();
    let mut pos = 0;
    while let Some((start, end)) = tag_block(fragment, tag, pos) {
        cells.push(&fragment[start..end]);
        pos = end;
    }
    cells
}

/// Every href value of the `<a>` tags in a fragment, in order.
fn links_in(fragment: &str) -> Vec<String> {
    let mut hrefs = Vec::new();
    let mut pos = 0;
    while let Some(rel) = fragment[pos..].find("<a ") {
        let tag_start = pos + rel;
        let tag_end = match fragment[tag_start..].find('>') {
            Some(e) => tag_start + e,
            None => break,
        };
        let opener = &fragment[tag_start..tag_end];
        if let Some(href) = attr_value(opener, "href") {
            hrefs.push(href.to_string());
        }
        pos = tag_end + 1;
    }
    hrefs
}

/// Value of a quoted attribute inside a tag opener.
pub(crate) fn attr_value<'a>(opener: &'a str, name: &str) -> Option<&'a str> {
    let probe = format!("{}=", name);
    let at = opener.find(&probe)? + probe.len();
    let rest = &opener[at..];
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        // Unquoted value: runs to the next whitespace
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        return Some(&rest[..end]);
    }
    let inner = &rest[1..];
    let end = inner.find(quote)?;
    Some(&inner[..end])
}

/// Visible text of an HTML fragment: tags dropped, entities decoded,
/// whitespace collapsed.
pub fn text_of(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#39;", "'")
        .replace("&quot;", "\"");

    // Collapse runs of whitespace to single spaces
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}
