//! Property-based tests for rust_worker_logger using proptest

use proptest::prelude::*;
use rust_worker_logger::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Critical),
    ]
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Names and indices both parse back to the same level
    #[test]
    fn test_log_level_str_roundtrip(level in any_level()) {
        let parsed: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);

        let by_index: LogLevel = (level as u8).to_string().parse().unwrap();
        prop_assert_eq!(level, by_index);

        prop_assert_eq!(LogLevel::from_letter(level.letter()), Some(level));
    }

    /// Ordering follows the numeric index
    #[test]
    fn test_log_level_ordering(a in any_level(), b in any_level()) {
        prop_assert_eq!(a.cmp(&b), (a as u8).cmp(&(b as u8)));
    }

    /// Indices outside 0..=5 are rejected
    #[test]
    fn test_log_level_rejects_out_of_range(index in 6u8..) {
        prop_assert!(LogLevel::try_from(index).is_err());
    }
}

// ============================================================================
// Filtering Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// An event reaches the sink iff its level is at or above the threshold
    #[test]
    fn test_filtering_matches_threshold(
        threshold in any_level(),
        events in prop::collection::vec(any_level(), 0..50),
    ) {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::builder()
            .min_level(threshold)
            .shared_sink(sink.clone())
            .build();

        for (i, level) in events.iter().enumerate() {
            logger.log(*level, format!("event {}", i));
        }

        let expected: Vec<LogLevel> = events.iter().copied().filter(|l| *l >= threshold).collect();
        let written: Vec<LogLevel> = sink.entries().iter().map(|e| e.level).collect();
        prop_assert_eq!(&written, &expected);
        prop_assert_eq!(
            logger.metrics().filtered_count() as usize,
            events.len() - expected.len()
        );
    }
}

// ============================================================================
// Line Format Tests
// ============================================================================

proptest! {
    /// Any message survives render then parse, and always yields one line
    #[test]
    fn test_line_round_trip(level in any_level(), message in ".*") {
        let entry = LogEntry::new(level, message.as_str());
        let line = LineFormat::default().render(&entry);

        prop_assert!(!line.contains('\n'));
        prop_assert!(!line.contains('\r'));

        let parsed = LogLine::parse(&line).unwrap();
        prop_assert_eq!(parsed.level, level);
        prop_assert_eq!(&parsed.message, &entry.message);
        prop_assert_eq!(parsed.thread.len(), 6);
        prop_assert!(parsed.thread.chars().all(|c| c.is_ascii_digit()));
    }

    /// Messages without control characters are written verbatim
    #[test]
    fn test_plain_messages_unchanged(message in "[a-zA-Z0-9 |:.()_-]{0,80}") {
        let entry = LogEntry::new(LogLevel::Info, message.as_str());
        prop_assert_eq!(entry.message, message);
    }
}

// ============================================================================
// Scope Tracing Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Nested scopes always emit balanced, properly nested Enter/Leave pairs
    #[test]
    fn test_enter_leave_balanced(depth in 0usize..8, fail_at in prop::option::of(0usize..8)) {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::builder()
            .min_level(LogLevel::Trace)
            .shared_sink(sink.clone())
            .build();

        fn nest(logger: &Logger, level: usize, depth: usize, fail_at: Option<usize>) -> Result<()> {
            if level == depth {
                return Ok(());
            }
            let _trace = logger.trace_scope(format!("level_{}", level));
            if fail_at == Some(level) {
                return Err(RuntimeError::other("early exit"));
            }
            nest(logger, level + 1, depth, fail_at)
        }

        let _ = nest(&logger, 0, depth, fail_at);

        let mut stack = Vec::new();
        for message in sink.messages() {
            if let Some(name) = message.strip_suffix("() Enter") {
                stack.push(name.to_string());
            } else if let Some(name) = message.strip_suffix("() Leave") {
                let opened = stack.pop();
                prop_assert_eq!(opened.as_deref(), Some(name));
            }
        }
        prop_assert!(stack.is_empty());
    }
}

// ============================================================================
// Rotation Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Files stay within the threshold unless holding one oversized line,
    /// indices are consecutive, and no line is lost or split
    #[test]
    fn test_rotation_bounds(
        threshold in 16u64..512,
        lengths in prop::collection::vec(0usize..200, 1..40),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let template = temp_dir.path().join("rot_%N.log");
        let sink = RotatingFileSink::new(template.to_string_lossy(), threshold).unwrap();
        let format = LineFormat::new("{message}").unwrap();

        for (i, len) in lengths.iter().enumerate() {
            let message = format!("{}{}", i % 10, "x".repeat(*len));
            sink.write(&LogEntry::new(LogLevel::Info, message), &format).unwrap();
        }
        sink.flush().unwrap();

        let last = sink.current_index();
        let mut lines = Vec::new();
        for index in 0..=last {
            let path = temp_dir.path().join(format!("rot_{}.log", index));
            let content = std::fs::read_to_string(&path).unwrap();
            let count = content.lines().count();
            prop_assert!(content.len() as u64 <= threshold || count == 1);
            lines.extend(content.lines().map(str::to_string));
        }

        prop_assert_eq!(lines.len(), lengths.len());
        for (i, (line, len)) in lines.iter().zip(&lengths).enumerate() {
            prop_assert_eq!(line.len(), len + 1);
            prop_assert!(line.starts_with(&(i % 10).to_string()));
        }
        let next_path = temp_dir.path().join(format!("rot_{}.log", last + 1));
        let next_exists = next_path.exists();
        prop_assert!(!next_exists);
    }
}
