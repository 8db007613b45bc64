//! Reference advertisement model for the smart HTTP `info/refs` response.
//!
//! The upstream response is decoded into a small record grammar:
//!
//! ```text
//! advertisement = service-header blank* first-ref other-ref* terminator
//! first-ref     = hash SP name [NUL capability *(SP capability)]
//! other-ref     = hash SP name
//! terminator    = flush | blank
//! ```
//!
//! See: https://git-scm.com/docs/http-protocol

use crate::pktline::{PktLine, PktLineCursor};
use crate::{GitError, Result};
use bytes::{Bytes, BytesMut};

/// The only service the proxy implements.
pub const UPLOAD_PACK_SERVICE: &str = "git-upload-pack";

/// Name of the symbolic reference advertised first by most servers.
pub const HEAD: &str = "HEAD";

/// Capability prefix announcing a symbolic reference.
pub const SYMREF_PREFIX: &str = "symref=";

const SERVICE_PREFIX: &str = "# service=";
const MIN_HASH_LEN: usize = 40;

/// One advertised reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    /// Object ID the ref points to, in hex.
    pub hash: String,
    /// Reference name.
    pub name: String,
    /// Capabilities carried after the NUL byte; only the first line has them.
    pub capabilities: Option<Vec<String>>,
}

impl RefEntry {
    /// Creates an entry without capabilities.
    pub fn new(hash: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            name: name.into(),
            capabilities: None,
        }
    }

    /// Attaches a capability list.
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = Some(capabilities.into_iter().map(Into::into).collect());
        self
    }

    /// Parses a decoded reference line.
    pub fn parse(line: &str) -> Result<Self> {
        let malformed = || GitError::MalformedRef(line.escape_debug().to_string());

        let mut parts = line.split('\0');
        let refspec = parts.next().unwrap_or_default();
        let capabilities = parts
            .next()
            .map(|caps| caps.split(' ').map(String::from).collect::<Vec<_>>());
        if parts.next().is_some() {
            return Err(malformed());
        }

        let fields: Vec<&str> = refspec.split(' ').collect();
        let [hash, name] = fields.as_slice() else {
            return Err(malformed());
        };
        if hash.len() < MIN_HASH_LEN || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed());
        }
        if name.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            hash: (*hash).to_string(),
            name: (*name).to_string(),
            capabilities,
        })
    }

    /// Formats the entry as a pkt-line payload.
    pub fn to_line(&self) -> String {
        match &self.capabilities {
            Some(caps) => format!("{} {}\0{}", self.hash, self.name, caps.join(" ")),
            None => format!("{} {}", self.hash, self.name),
        }
    }

    /// Returns the target of the first `symref=` capability, if any.
    pub fn symref(&self) -> Option<&str> {
        self.capabilities
            .as_deref()?
            .iter()
            .find_map(|cap| cap.strip_prefix(SYMREF_PREFIX))
    }
}

/// One decoded advertisement record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Flush packet (0000).
    Flush,
    /// Data line with an empty payload.
    Blank,
    /// `# service=<name>` header.
    Service(String),
    /// Reference line.
    Ref(RefEntry),
}

impl Record {
    /// Classifies a raw pkt-line.
    ///
    /// Lines must be UTF-8. Git itself never writes non-UTF-8 ref names in
    /// practice, and such a line is reported as [`GitError::MalformedRef`]
    /// rather than passed through.
    pub fn from_pkt(pkt: &PktLine) -> Result<Self> {
        let data = match pkt {
            PktLine::Flush => return Ok(Self::Flush),
            PktLine::Data(data) if data.is_empty() => return Ok(Self::Blank),
            PktLine::Data(data) => data,
        };

        let line = std::str::from_utf8(data).map_err(|_| {
            GitError::MalformedRef(String::from_utf8_lossy(data).escape_debug().to_string())
        })?;

        match line.strip_prefix(SERVICE_PREFIX) {
            Some(service) => Ok(Self::Service(service.to_string())),
            None => RefEntry::parse(line).map(Self::Ref),
        }
    }

    /// Returns true for records that separate or terminate sections.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Flush | Self::Blank)
    }

    /// Converts the record back into a pkt-line.
    pub fn to_pkt(&self) -> PktLine {
        match self {
            Self::Flush => PktLine::Flush,
            Self::Blank => PktLine::Data(Vec::new()),
            Self::Service(service) => PktLine::from_string(&service_line(service)),
            Self::Ref(entry) => PktLine::from_string(&entry.to_line()),
        }
    }
}

/// Decodes [`Record`]s from a buffered response body.
#[derive(Debug, Clone)]
pub struct RecordReader<'a> {
    cursor: PktLineCursor<'a>,
}

impl<'a> RecordReader<'a> {
    /// Creates a reader over `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            cursor: PktLineCursor::new(buf),
        }
    }

    /// Reads the next record.
    pub fn next_record(&mut self) -> Result<Record> {
        let pkt = self.cursor.read()?;
        Record::from_pkt(&pkt)
    }

    /// Reads the next record that is not a flush or blank line.
    pub fn next_non_blank(&mut self) -> Result<Record> {
        loop {
            let record = self.next_record()?;
            if !record.is_blank() {
                return Ok(record);
            }
        }
    }

    /// Bytes left after the last record read.
    pub fn remaining(&self) -> &'a [u8] {
        self.cursor.remaining()
    }
}

/// A decoded `info/refs` advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Service named in the header line.
    pub service: String,
    /// First reference, carrying the capability list.
    pub first: RefEntry,
    /// Remaining references in advertised order.
    pub others: Vec<RefEntry>,
}

impl Advertisement {
    /// Decodes an advertisement for `service` from a full response body.
    ///
    /// Anything following the terminating flush packet is ignored.
    pub fn decode(buf: &[u8], service: &str) -> Result<Self> {
        let mut reader = RecordReader::new(buf);

        let expected = service_line(service);
        match reader.next_record() {
            Ok(Record::Service(found)) if found == service => {}
            Ok(record) => {
                let raw = String::from_utf8_lossy(record.to_pkt().data().unwrap_or_default())
                    .into_owned();
                return Err(GitError::UnexpectedHeader(raw.escape_debug().to_string()));
            }
            Err(GitError::MalformedRef(raw)) => return Err(GitError::UnexpectedHeader(raw)),
            Err(e) => return Err(e),
        }
        tracing::trace!(header = %expected, "Service header accepted");

        let first = match reader.next_non_blank()? {
            Record::Ref(entry) => entry,
            other => return Err(unexpected_record(&other)),
        };

        let mut others = Vec::new();
        loop {
            match reader.next_record()? {
                Record::Ref(entry) => others.push(entry),
                Record::Flush | Record::Blank => break,
                other @ Record::Service(_) => return Err(unexpected_record(&other)),
            }
        }

        tracing::debug!(
            service = %service,
            first = %first.name,
            refs = others.len(),
            trailing = reader.remaining().len(),
            "Decoded reference advertisement"
        );

        Ok(Self {
            service: service.to_string(),
            first,
            others,
        })
    }

    /// Returns every record in wire order, terminator included.
    ///
    /// The header is followed by one blank line, which git servers emit and
    /// clients expect.
    pub fn records(&self) -> Vec<Record> {
        let mut first = self.first.clone();
        first.capabilities.get_or_insert_with(Vec::new);

        let mut records = Vec::with_capacity(self.others.len() + 4);
        records.push(Record::Service(self.service.clone()));
        records.push(Record::Blank);
        records.push(Record::Ref(first));
        records.extend(self.others.iter().cloned().map(Record::Ref));
        records.push(Record::Flush);
        records
    }

    /// Encodes the advertisement to its wire form.
    pub fn encode(&self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        for record in self.records() {
            record.to_pkt().encode_into(&mut out)?;
        }
        Ok(out.freeze())
    }

    /// Iterates over every advertised reference, first one included.
    pub fn refs(&self) -> impl Iterator<Item = &RefEntry> {
        std::iter::once(&self.first).chain(self.others.iter())
    }
}

fn service_line(service: &str) -> String {
    format!("{}{}", SERVICE_PREFIX, service)
}

fn unexpected_record(record: &Record) -> GitError {
    let raw = record.to_pkt();
    GitError::MalformedRef(
        String::from_utf8_lossy(raw.data().unwrap_or_default())
            .escape_debug()
            .to_string(),
    )
}
