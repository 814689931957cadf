//! Just enough IRC line parsing for the handshake and keepalive.

/// One inbound IRC line with tags and prefix stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Line<'a> {
    pub command: &'a str,
    pub params: Vec<&'a str>,
    pub trailing: Option<&'a str>,
}

impl<'a> Line<'a> {
    pub fn parse(raw: &'a str) -> Option<Self> {
        let mut rest = raw.trim_end_matches(['\r', '\n']);
        if let Some(tagged) = rest.strip_prefix('@') {
            rest = tagged.split_once(' ')?.1;
        }
        if let Some(prefixed) = rest.strip_prefix(':') {
            rest = prefixed.split_once(' ')?.1;
        }

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };
        let mut words = head.split(' ').filter(|w| !w.is_empty());
        let command = words.next()?;
        Some(Self {
            command,
            params: words.collect(),
            trailing,
        })
    }
}

/// Collapse line breaks so one message is always one IRC line.
pub(super) fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
