//! Status Log - Append-Only Event Sink
//!
//! The mask is applied on the way in: events the caller did not ask for are
//! never stored. Logs are passed explicitly; nothing here is global.

use crate::event::{Details, Event, EventPath, LogFormatError, Severity, SeverityMask};

/// Anything that can hand over a sequence of recorded events.
pub trait EventProvider {
    fn all_events(&self) -> &[Event];
}

impl EventProvider for [Event] {
    fn all_events(&self) -> &[Event] {
        self
    }
}

impl EventProvider for Vec<Event> {
    fn all_events(&self) -> &[Event] {
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusLog {
    mask: SeverityMask,
    events: Vec<Event>,
}

impl StatusLog {
    pub fn new(mask: SeverityMask) -> Self {
        Self {
            mask,
            events: Vec::new(),
        }
    }

    pub fn mask(&self) -> SeverityMask {
        self.mask
    }

    pub fn accepts(&self, severity: Severity) -> bool {
        self.mask.contains(severity)
    }

    /// Append events. Every event is checked first; if any lacks both message
    /// and code nothing is appended. Masked-out events are dropped.
    pub fn log<I>(&mut self, events: I) -> Result<(), LogFormatError>
    where
        I: IntoIterator<Item = Event>,
    {
        let events: Vec<Event> = events.into_iter().collect();
        for event in &events {
            event.validate()?;
        }
        let mask = self.mask;
        self.events.extend(
            events
                .into_iter()
                .filter(|e| mask.contains(e.severity))
                .map(Event::normalize),
        );
        Ok(())
    }

    pub fn add(
        &mut self,
        severity: Severity,
        path: Option<&EventPath>,
        message: Option<String>,
        code: Option<String>,
        details: Option<Details>,
    ) -> Result<(), LogFormatError> {
        let event = Event {
            severity,
            path: None,
            message,
            code,
            details,
        }
        .at(path);
        self.log([event])
    }

    // A message is always present, so the format check cannot fail.
    fn push_message(&mut self, severity: Severity, path: Option<&EventPath>, message: String) {
        self.events.push(Event::new(severity, message).at(path));
    }

    pub fn add_error(&mut self, path: Option<&EventPath>, message: impl Into<String>) {
        if self.accepts(Severity::Error) {
            self.push_message(Severity::Error, path, message.into());
        }
    }

    pub fn add_warning(&mut self, path: Option<&EventPath>, message: impl Into<String>) {
        if self.accepts(Severity::Warning) {
            self.push_message(Severity::Warning, path, message.into());
        }
    }

    pub fn add_info(&mut self, path: Option<&EventPath>, message: impl Into<String>) {
        if self.accepts(Severity::Info) {
            self.push_message(Severity::Info, path, message.into());
        }
    }

    pub fn add_success(&mut self, path: Option<&EventPath>, message: impl Into<String>) {
        if self.accepts(Severity::Success) {
            self.push_message(Severity::Success, path, message.into());
        }
    }

    fn push_coded(
        &mut self,
        severity: Severity,
        path: Option<&EventPath>,
        message: String,
        code: String,
    ) {
        if self.accepts(severity) {
            self.events
                .push(Event::new(severity, message).at(path).with_code(code));
        }
    }

    /// Error with a machine-readable code alongside the message.
    pub fn add_error_code(
        &mut self,
        path: Option<&EventPath>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) {
        self.push_coded(Severity::Error, path, message.into(), code.into());
    }

    pub fn add_warning_code(
        &mut self,
        path: Option<&EventPath>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) {
        self.push_coded(Severity::Warning, path, message.into(), code.into());
    }

    pub fn add_info_code(
        &mut self,
        path: Option<&EventPath>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) {
        self.push_coded(Severity::Info, path, message.into(), code.into());
    }

    pub fn add_success_code(
        &mut self,
        path: Option<&EventPath>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) {
        self.push_coded(Severity::Success, path, message.into(), code.into());
    }

    pub fn has_errors(&self) -> bool {
        self.events.iter().any(Event::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_error()).count()
    }

    pub fn errors(&self) -> impl DoubleEndedIterator<Item = &Event> {
        self.events.iter().filter(|e| e.is_error())
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Replay another provider's events into this log, optionally rewriting
    /// their paths. The receiving log's mask applies.
    pub fn import<P>(&mut self, source: &P, remap: Option<&PathRemap>) -> Result<(), LogFormatError>
    where
        P: EventProvider + ?Sized,
    {
        let events = source.all_events().iter().cloned().map(|mut event| {
            if let Some(remap) = remap {
                event.path = event.path.as_ref().map(|path| remap.apply(path));
            }
            event
        });
        self.log(events)
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new(SeverityMask::ALL)
    }
}

impl EventProvider for StatusLog {
    fn all_events(&self) -> &[Event] {
        &self.events
    }
}

/// Prefix rewrite rules for imported event paths.
///
/// Rules are supplied least specific first. For a given path the rule with
/// the longest matching prefix wins; among equally long prefixes the one
/// supplied last wins. Matching is on whole segments.
#[derive(Debug, Clone, Default)]
pub struct PathRemap {
    rules: Vec<(EventPath, EventPath)>,
}

impl PathRemap {
    pub fn new<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = (EventPath, EventPath)>,
    {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Rules in dotted string form, e.g. `[("a", "x"), ("a.b", "y")]`.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(from, to)| (EventPath::from(*from), EventPath::from(*to))),
        )
    }

    pub fn push(&mut self, from: EventPath, to: EventPath) {
        self.rules.push((from, to));
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn best_match<'a, 'p>(&'a self, path: &'p EventPath) -> Option<(&'a EventPath, &'p [String])> {
        let mut best: Option<(&'a EventPath, &'a EventPath, &'p [String])> = None;
        for (from, to) in self.rules.iter().rev() {
            let Some(rest) = path.strip_prefix(from) else {
                continue;
            };
            match best {
                Some((best_from, _, _)) if best_from.len() >= from.len() => {}
                _ => best = Some((from, to, rest)),
            }
        }
        best.map(|(_, to, rest)| (to, rest))
    }

    /// Rewritten path. Paths no rule matches come back unchanged.
    pub fn apply(&self, path: &EventPath) -> EventPath {
        match self.best_match(path) {
            Some((to, rest)) => to.join(&EventPath::from(rest.to_vec())),
            None => path.clone(),
        }
    }
}
