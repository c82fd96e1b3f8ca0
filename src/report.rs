//! Result line and run summary rendering.
//!
//! Every attempt is rendered twice with identical field order,
//! `marker host DOMAIN\user:password = label`: once with colour for the
//! terminal and once plain for the output file.
use colored::*;

use crate::credential::Credential;
use crate::outcome::Outcome;
use crate::scheduler::RunSummary;

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn section_header(title: &str) -> String {
    let len = visible_len(title);
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(len));
    s.push_str("\n\n");
    s
}

fn paint(text: &str, outcome: Outcome) -> ColoredString {
    if outcome.is_positive() {
        text.green()
    } else {
        text.red()
    }
}

/// Plain line for durable storage.
pub fn render_plain(host: &str, credential: &Credential, outcome: Outcome) -> String {
    format!(
        "{} {} {}:{} = {}",
        outcome.marker(),
        host,
        credential.down_level_logon_name(),
        credential.password,
        outcome.label()
    )
}

/// Terminal line; marker and label are coloured by outcome.
pub fn render_display(host: &str, credential: &Credential, outcome: Outcome) -> String {
    format!(
        "{} {} {}:{} = {}",
        paint(outcome.marker(), outcome),
        host,
        credential.down_level_logon_name(),
        credential.password,
        paint(outcome.label(), outcome)
    )
}

/// Warning shown before a clock-skew shutdown.
pub fn render_clock_skew(host: &str) -> String {
    format!(
        "{} The difference between the time on the Kerberos server {} and you is too great to continue",
        "[-]".red(),
        host
    )
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("Attempts: {}", summary.attempts));
    if summary.by_outcome.is_empty() {
        lines.push("(No completed attempts)".to_string());
    }
    for (outcome, count) in &summary.by_outcome {
        lines.push(format!(
            "  {} {:?}: {}",
            paint(outcome.marker(), *outcome),
            outcome,
            count
        ));
    }
    out.push_str(&section_header(&"Run Summary".bold().cyan().to_string()));
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_line_layout() {
        let c = Credential::new("alice", "Spring2025!", "corp.local");
        let line = render_plain("10.0.0.5", &c, Outcome::AccountLocked);
        insta::assert_snapshot!(line, @r"[-] 10.0.0.5 CORP.LOCAL\alice:Spring2025! = User's Account Locked");
    }

    #[test]
    fn display_matches_plain_modulo_colour() {
        let c = Credential::new("bob", "pw", "corp");
        for outcome in Outcome::ALL {
            let display = render_display("dc01", &c, outcome);
            let plain = render_plain("dc01", &c, outcome);
            assert_eq!(strip_ansi(&display), plain);
            assert_eq!(visible_len(&display), plain.chars().count());
        }
    }

    #[test]
    fn summary_lists_counts() {
        let mut s = RunSummary::default();
        s.record(Outcome::Success);
        s.record(Outcome::Failed);
        s.record(Outcome::Failed);
        let out = strip_ansi(&render_summary(&s));
        assert!(out.contains("Attempts: 3"));
        assert!(out.contains("[+] Success: 1"));
        assert!(out.contains("[-] Failed: 2"));
    }

    fn strip_ansi(s: &str) -> String {
        let mut out = String::new();
        let mut in_escape = false;
        for ch in s.chars() {
            match (in_escape, ch) {
                (false, '\u{1b}') => in_escape = true,
                (true, 'm') => in_escape = false,
                (true, _) => {}
                (false, c) => out.push(c),
            }
        }
        out
    }
}
