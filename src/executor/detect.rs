//! Command detection in free-form model output.
//!
//! Detection is a fixed, ordered table of independent matchers. Each
//! matcher reports its matches in text order and the table order decides
//! priority:
//!
//! 1. Fenced shell blocks (`powershell`, `ps1`, `cmd`, `bash`, `sh`, `shell`)
//! 2. Prompt-prefixed lines (`$ ` or `> `)
//! 3. Fenced `python` blocks
//! 4. Filesystem verbs (`New-Item`, `mkdir`, `touch`, `md`)
//!
//! Matchers are not mutually exclusive. A `mkdir` line inside a fenced
//! shell block produces a terminal-block descriptor and a make-directory
//! descriptor, and both run. Turning off `allow_overlapping` drops any
//! descriptor whose span lies inside one that was already accepted.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use super::command::{CommandDescriptor, CommandKind};

/// Characters a captured path argument may not contain.
const PATH_ARG: &str = r#"([^"'>\r\n;&|]+)"#;

struct Matcher {
    name: &'static str,
    kind: CommandKind,
    regex: Regex,
}

impl Matcher {
    fn new(name: &'static str, kind: CommandKind, pattern: &str) -> Self {
        Self {
            name,
            kind,
            regex: Regex::new(pattern)
                .unwrap_or_else(|e| panic!("invalid detector pattern {}: {}", name, e)),
        }
    }
}

static MATCHERS: Lazy<Vec<Matcher>> = Lazy::new(|| {
    let quoted_path = format!(r#"["']?{}["']?"#, PATH_ARG);

    vec![
        // Fenced shell blocks
        Matcher::new(
            "shell-fence",
            CommandKind::TerminalBlock,
            r"(?is)```(?:powershell|ps1|cmd|bash|sh|shell)[ \t]*\r?\n(.*?)\r?\n```",
        ),
        // Prompt-prefixed single lines
        Matcher::new(
            "dollar-prompt",
            CommandKind::TerminalLine,
            r"(?im)^\$[ \t]+(.+)$",
        ),
        Matcher::new(
            "angle-prompt",
            CommandKind::TerminalLine,
            r"(?im)^>[ \t]+(.+)$",
        ),
        // Fenced python blocks
        Matcher::new(
            "python-fence",
            CommandKind::PythonScript,
            r"(?is)```python[ \t]*\r?\n(.*?)\r?\n```",
        ),
        // PowerShell New-Item
        Matcher::new(
            "new-item-path-directory",
            CommandKind::MakeDirectory,
            &format!(
                r"(?i)\bNew-Item[ \t]+-Path[ \t]+{}[ \t]+-ItemType[ \t]+Directory\b",
                quoted_path
            ),
        ),
        Matcher::new(
            "new-item-directory-path",
            CommandKind::MakeDirectory,
            &format!(
                r"(?i)\bNew-Item[ \t]+-ItemType[ \t]+Directory[ \t]+-Path[ \t]+{}",
                quoted_path
            ),
        ),
        Matcher::new(
            "new-item-path-file",
            CommandKind::MakeFile,
            &format!(
                r"(?i)\bNew-Item[ \t]+-Path[ \t]+{}[ \t]+-ItemType[ \t]+File\b",
                quoted_path
            ),
        ),
        Matcher::new(
            "new-item-file-path",
            CommandKind::MakeFile,
            &format!(
                r"(?i)\bNew-Item[ \t]+-ItemType[ \t]+File[ \t]+-Path[ \t]+{}",
                quoted_path
            ),
        ),
        // mkdir is spelled the same in PowerShell, bash and cmd
        Matcher::new(
            "mkdir",
            CommandKind::MakeDirectory,
            &format!(
                r"(?i)\bmkdir[ \t]+(?:(?:-p|--parents)[ \t]+)?{}",
                quoted_path
            ),
        ),
        Matcher::new(
            "touch",
            CommandKind::MakeFile,
            &format!(r"(?i)\btouch[ \t]+{}", quoted_path),
        ),
        // cmd `md`, only at the start of a line
        Matcher::new(
            "md",
            CommandKind::MakeDirectory,
            &format!(r"(?im)^[ \t]*md[ \t]+{}", quoted_path),
        ),
    ]
});

/// Scans text for command-like constructs.
#[derive(Debug, Clone, Copy)]
pub struct CommandDetector {
    allow_overlapping: bool,
}

impl Default for CommandDetector {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CommandDetector {
    pub fn new(allow_overlapping: bool) -> Self {
        Self { allow_overlapping }
    }

    pub fn allows_overlapping(&self) -> bool {
        self.allow_overlapping
    }

    /// Detect every command in `text`, in priority order.
    ///
    /// Never fails; returns an empty vector when nothing matches.
    pub fn detect(&self, text: &str) -> Vec<CommandDescriptor> {
        let mut found: Vec<CommandDescriptor> = Vec::new();

        for matcher in MATCHERS.iter() {
            for caps in matcher.regex.captures_iter(text) {
                let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };

                let payload = body.as_str().trim();
                if payload.is_empty() {
                    continue;
                }

                let span = whole.range();
                if !self.allow_overlapping && covered(&found, &span) {
                    tracing::debug!(
                        "Suppressed overlapping {} match at {:?}",
                        matcher.name,
                        span
                    );
                    continue;
                }

                found.push(CommandDescriptor {
                    kind: matcher.kind.clone(),
                    payload: payload.to_string(),
                    original: whole.as_str().to_string(),
                    span,
                });
            }
        }

        found
    }
}

fn covered(accepted: &[CommandDescriptor], span: &Range<usize>) -> bool {
    accepted
        .iter()
        .any(|d| d.span.start <= span.start && span.end <= d.span.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Vec<CommandDescriptor> {
        CommandDetector::default().detect(text)
    }

    fn kinds(found: &[CommandDescriptor]) -> Vec<CommandKind> {
        found.iter().map(|d| d.kind.clone()).collect()
    }

    #[test]
    fn plain_text_yields_nothing() {
        assert!(detect("Sure, here is an explanation of recursion.").is_empty());
        assert!(detect("").is_empty());
    }

    #[test]
    fn mkdir_in_bash_fence_is_detected_twice() {
        let text = "Run this:\n```bash\nmkdir test\n```\n";
        let found = detect(text);

        assert_eq!(found.len(), 2, "{:?}", found);
        assert_eq!(found[0].kind, CommandKind::TerminalBlock);
        assert_eq!(found[0].payload, "mkdir test");
        assert_eq!(found[1].kind, CommandKind::MakeDirectory);
        assert_eq!(found[1].payload, "test");
    }

    #[test]
    fn overlap_suppression_keeps_outer_block() {
        let text = "```bash\nmkdir test\n```";
        let found = CommandDetector::new(false).detect(text);

        assert_eq!(kinds(&found), vec![CommandKind::TerminalBlock]);
    }

    #[test]
    fn overlap_suppression_keeps_unrelated_matches() {
        let text = "```bash\nls\n```\nThen mkdir outside";
        let found = CommandDetector::new(false).detect(text);

        assert_eq!(
            kinds(&found),
            vec![CommandKind::TerminalBlock, CommandKind::MakeDirectory]
        );
        assert_eq!(found[1].payload, "outside");
    }

    #[test]
    fn fence_tags_are_case_insensitive() {
        for tag in ["powershell", "PS1", "cmd", "Bash", "sh", "shell"] {
            let text = format!("```{}\necho hi\n```", tag);
            let found = detect(&text);
            assert_eq!(found.len(), 1, "tag {}", tag);
            assert_eq!(found[0].kind, CommandKind::TerminalBlock);
            assert_eq!(found[0].payload, "echo hi");
        }
    }

    #[test]
    fn multi_line_block_body_is_kept_whole() {
        let text = "```sh\necho one\necho two\n```";
        let found = detect(text);
        assert_eq!(found[0].payload, "echo one\necho two");
        assert_eq!(found[0].original, text);
        assert_eq!(found[0].span, 0..text.len());
    }

    #[test]
    fn prompt_lines() {
        let text = "First:\n$ echo hello\nthen\n> dir\n";
        let found = detect(text);

        assert_eq!(
            kinds(&found),
            vec![CommandKind::TerminalLine, CommandKind::TerminalLine]
        );
        assert_eq!(found[0].payload, "echo hello");
        assert_eq!(found[1].payload, "dir");
    }

    #[test]
    fn prompt_marker_must_start_the_line() {
        assert!(detect("costs $ 5 today").is_empty());
    }

    #[test]
    fn python_fence() {
        let text = "```python\nprint('hi')\n```";
        let found = detect(text);
        assert_eq!(kinds(&found), vec![CommandKind::PythonScript]);
        assert_eq!(found[0].payload, "print('hi')");
    }

    #[test]
    fn priority_order_is_by_matcher_not_position() {
        let text = "touch early.txt\n```python\nprint(1)\n```\n$ echo late";
        let found = detect(text);

        assert_eq!(
            kinds(&found),
            vec![
                CommandKind::TerminalLine,
                CommandKind::PythonScript,
                CommandKind::MakeFile,
            ]
        );
    }

    #[test]
    fn new_item_variants() {
        let text = "New-Item -Path \"src\" -ItemType Directory\n\
                    New-Item -ItemType Directory -Path docs\n\
                    New-Item -Path 'notes.txt' -ItemType File\n\
                    new-item -itemtype file -path readme.md";
        let found = detect(text);

        let pairs: Vec<(CommandKind, &str)> = found
            .iter()
            .map(|d| (d.kind.clone(), d.payload.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (CommandKind::MakeDirectory, "src"),
                (CommandKind::MakeDirectory, "docs"),
                (CommandKind::MakeFile, "notes.txt"),
                (CommandKind::MakeFile, "readme.md"),
            ]
        );
    }

    #[test]
    fn mkdir_parents_flag_is_not_part_of_path() {
        let found = detect("mkdir -p a/b/c");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].payload, "a/b/c");

        let found = detect("mkdir --parents x/y");
        assert_eq!(found[0].payload, "x/y");
    }

    #[test]
    fn quoted_paths_are_unwrapped() {
        let found = detect("touch \"my file.txt\"");
        assert_eq!(found[0].kind, CommandKind::MakeFile);
        assert_eq!(found[0].payload, "my file.txt");
    }

    #[test]
    fn path_stops_at_redirect_and_separators() {
        let found = detect("mkdir logs > /dev/null");
        assert_eq!(found[0].payload, "logs");

        let found = detect("mkdir build && cd build");
        assert_eq!(found[0].payload, "build");
    }

    #[test]
    fn cmd_md_only_at_line_start() {
        let found = detect("md output\n");
        assert_eq!(kinds(&found), vec![CommandKind::MakeDirectory]);
        assert_eq!(found[0].payload, "output");

        assert!(detect("See README.md for details").is_empty());
    }

    #[test]
    fn cmd_fence_tag_does_not_trigger_md() {
        let found = detect("```cmd\necho hi\n```");
        assert_eq!(kinds(&found), vec![CommandKind::TerminalBlock]);
    }

    #[test]
    fn crlf_line_endings() {
        let text = "```bash\r\nmkdir win\r\n```\r\n";
        let found = detect(text);
        assert_eq!(found[0].kind, CommandKind::TerminalBlock);
        assert_eq!(found[0].payload, "mkdir win");
        assert_eq!(found[1].payload, "win");
    }
}
