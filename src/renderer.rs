use crate::importer::{Comment, Message};
use std::io::Write;

pub const NO_CONTENT: &str = "(No Content)";
pub const UNKNOWN: &str = "(unknown)";
const DOCUMENT_TITLE: &str = "BlackPulse Messages Export";

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or(UNKNOWN)
}

/// Write a standalone document for one message and its comments.
///
/// `comments` is whatever the store actually returned; the comment section is
/// omitted when it is empty even if the message's counter says otherwise.
pub fn write_message_document<W: Write>(
    writer: &mut W,
    msg: &Message,
    comments: &[Comment],
) -> std::io::Result<()> {
    writeln!(writer, "# Message ID: {}", msg.id)?;
    writeln!(writer)?;
    writeln!(writer, "**Timestamp:** {}", or_unknown(msg.timestamp.as_deref()))?;
    writeln!(writer)?;
    writeln!(
        writer,
        "**Is Private:** {}",
        if msg.is_private { "Yes" } else { "No" }
    )?;
    writeln!(writer)?;
    if let Some(key) = msg.key() {
        writeln!(writer, "**Private Key:** `{}`", key)?;
        writeln!(writer)?;
    }
    writeln!(writer, "**Comment Count:** {}", msg.comment_count)?;
    writeln!(writer)?;
    separator(writer)?;

    writeln!(writer, "## Content")?;
    writeln!(writer)?;
    writeln!(writer, "{}", msg.body().unwrap_or(NO_CONTENT))?;
    writeln!(writer)?;
    separator(writer)?;

    if !comments.is_empty() {
        writeln!(writer, "## Comments ({})", comments.len())?;
        writeln!(writer)?;
        for comment in comments {
            write_comment(writer, comment)?;
        }
    }

    Ok(())
}

fn write_comment<W: Write>(writer: &mut W, comment: &Comment) -> std::io::Result<()> {
    writeln!(writer, "### Comment ID: {}", comment.id)?;
    writeln!(writer)?;
    writeln!(writer, "**User:** {}", comment.username)?;
    writeln!(writer)?;
    writeln!(writer, "**Time:** {}", or_unknown(comment.time.as_deref()))?;
    writeln!(writer)?;
    writeln!(writer, "**Likes:** {}", comment.likes)?;
    writeln!(writer)?;
    if let Some(pid) = comment.pid {
        writeln!(writer, "**Reply to:** Comment ID {}", pid)?;
        writeln!(writer)?;
    }
    writeln!(writer, "{}", comment.text)?;
    writeln!(writer)?;
    separator(writer)
}

/// Title block of the single combined dump.
pub fn write_dump_header<W: Write>(writer: &mut W, total: usize) -> std::io::Result<()> {
    writeln!(writer, "# {}", DOCUMENT_TITLE)?;
    writeln!(writer)?;
    writeln!(writer, "**Total Messages:** {}", total)?;
    writeln!(writer)?;
    separator(writer)
}

/// Title block of one paginated part. The packer charges it as five lines.
pub fn write_part_header<W: Write>(writer: &mut W, index: usize) -> std::io::Result<()> {
    writeln!(writer, "# {} (Part {})", DOCUMENT_TITLE, index)?;
    writeln!(writer)?;
    writeln!(writer, "**File Index:** {}", index)?;
    writeln!(writer)?;
    separator(writer)
}

/// One message inside a combined document (dump or part).
pub fn write_message_entry<W: Write>(writer: &mut W, msg: &Message) -> std::io::Result<()> {
    writeln!(writer, "## Message ID: {}", msg.id)?;
    writeln!(writer)?;
    writeln!(writer, "{}", msg.body().unwrap_or(NO_CONTENT))?;
    writeln!(writer)?;
    separator(writer)
}

fn separator<W: Write>(writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "---")?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: i64, content: Option<&str>) -> Message {
        Message {
            id,
            content: content.map(str::to_string),
            private_key: None,
            is_private: false,
            timestamp: Some("2024-05-01 12:00:00".into()),
            user_id: None,
            comment_count: 0,
        }
    }

    fn comment(id: i64, pid: Option<i64>) -> Comment {
        Comment {
            id,
            message_id: 1,
            username: "alice".into(),
            text: format!("comment {id}"),
            likes: 3,
            time: Some("2024-05-02".into()),
            pid,
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn document_without_comments() {
        let msg = Message {
            private_key: Some("abc".into()),
            is_private: true,
            ..message(42, Some("hello\nworld"))
        };
        let out = render(|w| write_message_document(w, &msg, &[]));
        assert_eq!(
            out,
            "# Message ID: 42\n\n\
             **Timestamp:** 2024-05-01 12:00:00\n\n\
             **Is Private:** Yes\n\n\
             **Private Key:** `abc`\n\n\
             **Comment Count:** 0\n\n\
             ---\n\n\
             ## Content\n\n\
             hello\nworld\n\n\
             ---\n\n"
        );
    }

    #[test]
    fn document_with_comments_and_reply() {
        let msg = Message {
            comment_count: 5,
            ..message(1, None)
        };
        let comments = [comment(1, None), comment(2, Some(1))];
        let out = render(|w| write_message_document(w, &msg, &comments));

        assert!(out.contains("**Is Private:** No\n\n"));
        assert!(!out.contains("Private Key"));
        assert!(out.contains("**Comment Count:** 5\n\n"));
        assert!(out.contains("## Content\n\n(No Content)\n\n---\n\n"));
        assert!(out.contains("## Comments (2)\n\n### Comment ID: 1\n\n"));
        assert_eq!(out.matches("**Reply to:**").count(), 1);
        assert!(out.ends_with(
            "### Comment ID: 2\n\n\
             **User:** alice\n\n\
             **Time:** 2024-05-02\n\n\
             **Likes:** 3\n\n\
             **Reply to:** Comment ID 1\n\n\
             comment 2\n\n\
             ---\n\n"
        ));
    }

    #[test]
    fn counter_without_rows_has_no_comment_section() {
        let msg = Message {
            comment_count: 2,
            ..message(3, Some("x"))
        };
        let out = render(|w| write_message_document(w, &msg, &[]));
        assert!(!out.contains("## Comments"));
    }

    #[test]
    fn missing_timestamp_placeholder() {
        let msg = Message {
            timestamp: None,
            ..message(3, Some("x"))
        };
        let out = render(|w| write_message_document(w, &msg, &[]));
        assert!(out.contains("**Timestamp:** (unknown)\n"));
    }

    #[test]
    fn entry_keeps_content_verbatim() {
        let raw = "  <b>*not* escaped*</b>\n\n# heading  ";
        let out = render(|w| write_message_entry(w, &message(9, Some(raw))));
        assert_eq!(out, format!("## Message ID: 9\n\n{raw}\n\n---\n\n"));
    }

    #[test]
    fn entry_empty_content_placeholder() {
        let out = render(|w| write_message_entry(w, &message(9, Some(""))));
        assert_eq!(out, "## Message ID: 9\n\n(No Content)\n\n---\n\n");
    }

    #[test]
    fn headers() {
        assert_eq!(
            render(|w| write_dump_header(w, 12)),
            "# BlackPulse Messages Export\n\n**Total Messages:** 12\n\n---\n\n"
        );
        let part = render(|w| write_part_header(w, 3));
        assert_eq!(
            part,
            "# BlackPulse Messages Export (Part 3)\n\n**File Index:** 3\n\n---\n\n"
        );
    }
}
