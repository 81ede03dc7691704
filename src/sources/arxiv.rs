//! Atom feed decoding for arXiv export API responses.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::models::{Author, Category, Link, Page, Record};
use crate::sources::HarvestError;

/// Normalize a user-supplied identifier for use in `id_list`.
///
/// Handles formats like:
/// - "2301.12345"
/// - "2301.12345v2" (version is kept, the API accepts it)
/// - "arxiv:2301.12345"
/// - "https://arxiv.org/abs/2301.12345v1"
/// - "math.GT/0104020" (old style, case is preserved)
pub fn normalize_id(id: &str) -> Result<String, HarvestError> {
    let id = id.trim();

    let id = match id.find("/abs/") {
        Some(pos) => &id[pos + 5..],
        None => id,
    };

    let id = match id.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("arxiv:") => &id[6..],
        _ => id,
    };

    let id = id.trim_end_matches('/');
    if id.is_empty() {
        return Err(HarvestError::InvalidQuery("Empty arXiv ID".to_string()));
    }

    Ok(id.to_string())
}

/// Decode one Atom response into a [`Page`].
///
/// Elements are matched on their local name, so the `opensearch:` and
/// `arxiv:` prefixes used by the API do not need to be declared. Missing
/// pagination counters decode as zero, but a body without a `feed` element
/// (empty, plain text, an HTML error page) is a decode error.
pub fn decode_page(body: &[u8]) -> Result<Page, HarvestError> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut page = Page::default();
    let mut entry: Option<Record> = None;
    let mut author: Option<Author> = None;
    let mut text = String::new();
    let mut seen_feed = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                text.clear();
                match e.local_name().as_ref() {
                    b"feed" => seen_feed = true,
                    b"entry" => entry = Some(Record::default()),
                    b"author" if entry.is_some() => author = Some(Author::default()),
                    _ => {
                        if let Some(record) = entry.as_mut() {
                            read_attributes(e, record)?;
                        }
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"feed" {
                    seen_feed = true;
                } else if let Some(record) = entry.as_mut() {
                    read_attributes(e, record)?;
                }
            }
            Ok(Event::Text(e)) => {
                let unescaped = e
                    .unescape()
                    .map_err(|err| HarvestError::Decode(format!("Bad text content: {}", err)))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(ref e)) => {
                let value = std::mem::take(&mut text);
                match e.local_name().as_ref() {
                    b"entry" => {
                        if let Some(record) = entry.take() {
                            page.records.push(record);
                        }
                    }
                    b"author" => {
                        if let (Some(record), Some(a)) = (entry.as_mut(), author.take()) {
                            record.authors.push(a);
                        }
                    }
                    name => {
                        if let Some(a) = author.as_mut() {
                            match name {
                                b"name" => a.name = value,
                                b"affiliation" => a.affiliation = value,
                                _ => {}
                            }
                        } else if let Some(record) = entry.as_mut() {
                            set_record_field(record, name, value);
                        } else {
                            set_page_field(&mut page, name, &value)?;
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(HarvestError::Decode(format!(
                    "XML parsing error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
        buf.clear();
    }

    if !seen_feed {
        return Err(HarvestError::Decode("Response is not an Atom feed".to_string()));
    }

    if entry.is_some() {
        return Err(HarvestError::Decode("Unterminated entry element".to_string()));
    }

    Ok(page)
}

fn set_record_field(record: &mut Record, name: &[u8], value: String) {
    match name {
        b"id" => record.id = value,
        b"updated" => record.updated = value,
        b"published" => record.published = value,
        b"title" => record.title = value,
        b"summary" => record.summary = value,
        b"comment" => record.comment = value,
        b"doi" => record.doi = value,
        b"journal_ref" => record.journal_ref = value,
        _ => {}
    }
}

fn set_page_field(page: &mut Page, name: &[u8], value: &str) -> Result<(), HarvestError> {
    let slot = match name {
        b"totalResults" => &mut page.total_results,
        b"itemsPerPage" => &mut page.items_per_page,
        b"startIndex" => &mut page.start_index,
        _ => return Ok(()),
    };

    *slot = value.trim().parse().map_err(|_| {
        HarvestError::Decode(format!(
            "{} is not an integer: {:?}",
            String::from_utf8_lossy(name),
            value
        ))
    })?;
    Ok(())
}

/// Pick up the attribute-only elements of an entry
fn read_attributes(e: &BytesStart<'_>, record: &mut Record) -> Result<(), HarvestError> {
    match e.local_name().as_ref() {
        b"link" => record.links.push(Link {
            title: attr(e, b"title")?.unwrap_or_default(),
            href: attr(e, b"href")?.unwrap_or_default(),
            rel: attr(e, b"rel")?.unwrap_or_default(),
        }),
        b"category" => {
            if let Some(term) = attr(e, b"term")? {
                record.categories.push(Category::new(term));
            }
        }
        b"primary_category" => {
            if let Some(term) = attr(e, b"term")? {
                record.primary_category = Category::new(term);
            }
        }
        _ => {}
    }
    Ok(())
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, HarvestError> {
    for attribute in e.attributes() {
        let attribute =
            attribute.map_err(|err| HarvestError::Decode(format!("Bad attribute: {}", err)))?;
        if attribute.key.local_name().as_ref() == name {
            let value = attribute
                .unescape_value()
                .map_err(|err| HarvestError::Decode(format!("Bad attribute value: {}", err)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
