//! Scripted transport for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::sources::{HarvestError, Transport};

/// A transport that replays predefined responses in order.
///
/// Once the script runs out, the last response is repeated, which makes
/// "the server keeps answering the same thing" easy to express. Every
/// requested URL is recorded.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Vec<Result<Vec<u8>, HarvestError>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Create a transport from a response script.
    pub fn new(responses: Vec<Result<Vec<u8>, HarvestError>>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a transport that answers with the given bodies.
    pub fn from_bodies<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            bodies
                .into_iter()
                .map(|body| Ok(body.into().into_bytes()))
                .collect(),
        )
    }

    /// URLs fetched so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of fetches performed.
    pub fn fetch_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        let index = {
            let mut guard = self.requests.lock().unwrap();
            guard.push(url.to_string());
            guard.len() - 1
        };

        match self.responses.get(index).or_else(|| self.responses.last()) {
            Some(response) => response.clone(),
            None => Err(HarvestError::Transport(format!(
                "no scripted response for {}",
                url
            ))),
        }
    }
}

/// Helper function to build an Atom response page for testing.
///
/// Entries are numbered from `start_index`, so consecutive pages carry
/// distinct identifiers.
pub fn atom_feed(
    start_index: usize,
    items_per_page: usize,
    total_results: usize,
    records: usize,
) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query</title>
"#,
    );
    xml.push_str(&format!(
        "  <opensearch:totalResults>{}</opensearch:totalResults>\n  <opensearch:startIndex>{}</opensearch:startIndex>\n  <opensearch:itemsPerPage>{}</opensearch:itemsPerPage>\n",
        total_results, start_index, items_per_page
    ));

    for n in start_index..start_index + records {
        xml.push_str(&format!(
            r#"  <entry>
    <id>http://arxiv.org/abs/{n:04}.00001v1</id>
    <title>Paper {n}</title>
    <summary>Abstract {n}</summary>
    <author><name>Author {n}</name></author>
    <arxiv:primary_category term="math.GT"/>
    <category term="math.GT"/>
    <link title="pdf" href="http://arxiv.org/pdf/{n:04}.00001v1" rel="related"/>
  </entry>
"#
        ));
    }

    xml.push_str("</feed>\n");
    xml
}
