use compact_str::CompactString;
use std::net::IpAddr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::sync::CancellationToken;
use warden_dns_domain::{normalize_domain, DomainError, RuleEntry};

/// Longest accepted input line. Anything beyond this is treated like a
/// scanner overflow: non-resumable.
const MAX_LINE_LEN: usize = 1 << 20;

/// Entry from one `IP name [alias…]` hosts-file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostsFileEntry {
    pub ip: IpAddr,
    /// Optional `%interface` suffix on the address field.
    pub interface: Option<CompactString>,
    pub names: Vec<CompactString>,
}

/// Normalized entry produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    Rule(RuleEntry),
    Hosts(HostsFileEntry),
}

impl ListEntry {
    /// Flatten into rule entries: a hosts line contributes one exact rule
    /// per name.
    pub fn into_rules(self) -> Vec<RuleEntry> {
        match self {
            ListEntry::Rule(rule) => vec![rule],
            ListEntry::Hosts(entry) => entry
                .names
                .into_iter()
                .map(RuleEntry::Exact)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    /// `IP name [alias…]` per line.
    Hosts,
    /// One name / `/regex/` / `*.suffix` per line.
    HostList,
    /// Per-line detection between the two shapes.
    Auto,
}

/// Callback receiving resumable (single-line) errors.
pub type ErrorCallback = Box<dyn FnMut(&DomainError) + Send>;

/// Lazy, cancellable rule-source parser.
///
/// One bad line is reported through the error callback and skipped; I/O
/// failures, cancellation, over-long lines, and exceeding the resumable
/// error cap terminate iteration.
pub struct ListParser<R> {
    lines: Lines<R>,
    mode: ParseMode,
    line_no: usize,
    error_count: usize,
    max_errors: Option<usize>,
    on_error: Option<ErrorCallback>,
    cancel: CancellationToken,
}

impl<R: AsyncBufRead + Unpin> ListParser<R> {
    pub fn hosts(reader: R) -> Self {
        Self::with_mode(reader, ParseMode::Hosts)
    }

    pub fn host_list(reader: R) -> Self {
        Self::with_mode(reader, ParseMode::HostList)
    }

    pub fn auto(reader: R) -> Self {
        Self::with_mode(reader, ParseMode::Auto)
    }

    fn with_mode(reader: R, mode: ParseMode) -> Self {
        Self {
            lines: reader.lines(),
            mode,
            line_no: 0,
            error_count: 0,
            max_errors: None,
            on_error: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Short-circuit to non-resumable after this many bad lines.
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = Some(max_errors);
        self
    }

    pub fn with_error_callback(mut self, on_error: ErrorCallback) -> Self {
        self.on_error = Some(on_error);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Position string attached to surfaced errors.
    pub fn position(&self) -> String {
        format!("line {}", self.line_no)
    }

    /// Next entry, `None` at end of input.
    pub async fn next_entry(&mut self) -> Result<Option<ListEntry>, DomainError> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }

            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(None),
                Err(e) => {
                    return Err(DomainError::Io(format!("{} ({})", e, self.position())));
                }
            };
            self.line_no += 1;

            if line.len() > MAX_LINE_LEN {
                return Err(DomainError::Io(format!(
                    "line exceeds {MAX_LINE_LEN} bytes ({})",
                    self.position()
                )));
            }

            // `#` starts a comment in both shapes.
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            match self.parse_line(content) {
                Ok(entry) => return Ok(Some(entry)),
                Err(reason) => {
                    let err = DomainError::InvalidRule {
                        position: self.position(),
                        reason,
                    };
                    self.error_count += 1;
                    if let Some(on_error) = &mut self.on_error {
                        on_error(&err);
                    }
                    if let Some(max) = self.max_errors {
                        if self.error_count > max {
                            return Err(DomainError::TooManyInvalidRules(self.error_count));
                        }
                    }
                }
            }
        }
    }

    fn parse_line(&self, content: &str) -> Result<ListEntry, String> {
        match self.mode {
            ParseMode::Hosts => parse_hosts_line(content).map(ListEntry::Hosts),
            ParseMode::HostList => parse_host_list_line(content).map(ListEntry::Rule),
            ParseMode::Auto => {
                // A line whose first token is an address followed by at
                // least one name is hosts-shaped; everything else is a
                // host-list line.
                let mut tokens = content.split_whitespace();
                let first = tokens.next().unwrap_or("");
                let has_names = tokens.next().is_some();
                if has_names && parse_hosts_address(first).is_ok() {
                    parse_hosts_line(content).map(ListEntry::Hosts)
                } else {
                    parse_host_list_line(content).map(ListEntry::Rule)
                }
            }
        }
    }
}

fn parse_hosts_address(token: &str) -> Result<(IpAddr, Option<CompactString>), String> {
    let (addr, interface) = match token.split_once('%') {
        Some((addr, iface)) if !iface.is_empty() => (addr, Some(CompactString::from(iface))),
        Some(_) => return Err(format!("empty interface suffix in '{token}'")),
        None => (token, None),
    };
    addr.parse::<IpAddr>()
        .map(|ip| (ip, interface))
        .map_err(|_| format!("invalid address '{token}'"))
}

fn parse_hosts_line(content: &str) -> Result<HostsFileEntry, String> {
    let mut tokens = content.split_whitespace();
    let addr_token = tokens.next().ok_or("empty line")?;
    let (ip, interface) = parse_hosts_address(addr_token)?;

    let mut names = Vec::new();
    for token in tokens {
        let name = normalize_domain(token).map_err(|e| e.to_string())?;
        names.push(name);
    }
    if names.is_empty() {
        return Err(format!("address '{addr_token}' without a hostname"));
    }

    Ok(HostsFileEntry {
        ip,
        interface,
        names,
    })
}

fn parse_host_list_line(content: &str) -> Result<RuleEntry, String> {
    let mut tokens = content.split_whitespace();
    let token = tokens.next().ok_or("empty line")?;
    if let Some(extra) = tokens.next() {
        return Err(format!("unexpected token '{extra}'"));
    }
    RuleEntry::from_token(token).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    async fn collect_host_list(text: &str) -> Vec<ListEntry> {
        let mut parser = ListParser::host_list(Cursor::new(text.to_string()));
        let mut entries = Vec::new();
        while let Some(entry) = parser.next_entry().await.unwrap() {
            entries.push(entry);
        }
        entries
    }

    #[tokio::test]
    async fn test_host_list_basic() {
        let entries =
            collect_host_list("ads.example.com\n# comment\n\n*.tracker.net\n/^ad[0-9]+/\n").await;
        assert_eq!(
            entries,
            vec![
                ListEntry::Rule(RuleEntry::Exact("ads.example.com".into())),
                ListEntry::Rule(RuleEntry::Wildcard("tracker.net".into())),
                ListEntry::Rule(RuleEntry::Regex("^ad[0-9]+".into())),
            ]
        );
    }

    #[tokio::test]
    async fn test_trailing_comment_stripped() {
        let entries = collect_host_list("ads.example.com # midnight visitors\n").await;
        assert_eq!(
            entries,
            vec![ListEntry::Rule(RuleEntry::Exact("ads.example.com".into()))]
        );
    }

    #[tokio::test]
    async fn test_hosts_file_line() {
        let mut parser = ListParser::hosts(Cursor::new("0.0.0.0 Tracker.Evil.com alias.evil.com\n"));
        let entry = parser.next_entry().await.unwrap().unwrap();
        assert_eq!(
            entry,
            ListEntry::Hosts(HostsFileEntry {
                ip: "0.0.0.0".parse().unwrap(),
                interface: None,
                names: vec!["tracker.evil.com".into(), "alias.evil.com".into()],
            })
        );
    }

    #[tokio::test]
    async fn test_hosts_interface_suffix() {
        let mut parser = ListParser::hosts(Cursor::new("fe80::1%eth0 router.lan\n"));
        let entry = parser.next_entry().await.unwrap().unwrap();
        match entry {
            ListEntry::Hosts(hosts) => {
                assert_eq!(hosts.interface.as_deref(), Some("eth0"));
                assert_eq!(hosts.names, vec![CompactString::from("router.lan")]);
            }
            other => panic!("expected hosts entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_auto_detects_per_line() {
        let mut parser = ListParser::auto(Cursor::new(
            "0.0.0.0 ads.example.com\nplain.example.net\n203.0.113.9\n",
        ));
        let first = parser.next_entry().await.unwrap().unwrap();
        assert!(matches!(first, ListEntry::Hosts(_)));

        let second = parser.next_entry().await.unwrap().unwrap();
        assert_eq!(
            second,
            ListEntry::Rule(RuleEntry::Exact("plain.example.net".into()))
        );

        // A bare address line is an IP rule, not a hosts line.
        let third = parser.next_entry().await.unwrap().unwrap();
        assert_eq!(
            third,
            ListEntry::Rule(RuleEntry::Ip("203.0.113.9".parse().unwrap()))
        );
    }

    #[tokio::test]
    async fn test_bad_line_is_resumable_and_reported() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let mut parser = ListParser::host_list(Cursor::new("good.example.com\nbad domain line\nalso-good.example.com\n"))
            .with_error_callback(Box::new(move |e| {
                seen_clone.lock().unwrap().push(e.to_string());
            }));

        let mut entries = Vec::new();
        while let Some(entry) = parser.next_entry().await.unwrap() {
            entries.push(entry);
        }

        assert_eq!(entries.len(), 2);
        let errors = seen.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("line 2"), "position missing: {}", errors[0]);
    }

    #[tokio::test]
    async fn test_error_cap_short_circuits() {
        let mut parser =
            ListParser::host_list(Cursor::new("a b\nc d\ne f\ngood.example.com\n")).with_max_errors(1);

        let err = loop {
            match parser.next_entry().await {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected the error cap to fire"),
                Err(e) => break e,
            }
        };
        assert!(matches!(err, DomainError::TooManyInvalidRules(2)));
    }

    #[tokio::test]
    async fn test_cancellation_terminates() {
        let token = CancellationToken::new();
        token.cancel();
        let mut parser = ListParser::host_list(Cursor::new("ads.example.com\n"))
            .with_cancellation(token);
        assert!(matches!(
            parser.next_entry().await,
            Err(DomainError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_round_trip_modulo_normalization() {
        let entries = collect_host_list("ADS.Example.COM.\n*.Tracker.NET\n").await;
        let formatted: Vec<String> = entries
            .iter()
            .map(|e| match e {
                ListEntry::Rule(r) => r.to_string(),
                ListEntry::Hosts(_) => unreachable!(),
            })
            .collect();
        let reparsed = collect_host_list(&formatted.join("\n")).await;
        assert_eq!(entries, reparsed);
    }
}
