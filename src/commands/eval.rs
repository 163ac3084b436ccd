//! `/eval` — sandboxed expression evaluation.
//!
//! The handler is a thin shell: everything interesting happens behind
//! [`Sandbox::evaluate`], which never errors and never blocks past its
//! budget. The reply shows the original source and the outcome as HTML
//! code blocks.

use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};

use crate::bot::AppState;
use crate::error::Result;
use crate::sandbox::Evaluation;
use crate::utils::escape_html;

/// Handle one `/eval` invocation.
pub async fn handle(bot: &Bot, chat_id: ChatId, source: &str, state: &AppState) -> Result<()> {
    let outcome = state.sandbox.evaluate(source).await;
    bot.send_message(chat_id, format_reply(source, &outcome))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Format the reply: the submitted code and the rendered output (or the
/// failure message, verbatim) as separate code blocks.
pub(crate) fn format_reply(source: &str, outcome: &Evaluation) -> String {
    format!(
        "Code:\n<pre>{}</pre>\n\nOutput:\n<pre>{}</pre>",
        escape_html(source),
        escape_html(outcome.output_text())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::FailureKind;

    #[test]
    fn test_format_success_reply() {
        let outcome = Evaluation::Success {
            rendered: "3".into(),
        };
        let reply = format_reply("1 + 2", &outcome);
        assert_eq!(
            reply,
            "Code:\n<pre>1 + 2</pre>\n\nOutput:\n<pre>3</pre>"
        );
    }

    #[test]
    fn test_format_failure_reply_shows_message_verbatim() {
        let outcome = Evaluation::Failure {
            kind: FailureKind::Syntax,
            message: "syntax error: empty program".into(),
        };
        let reply = format_reply("", &outcome);
        assert!(reply.contains("syntax error: empty program"));
    }

    #[test]
    fn test_format_reply_escapes_html() {
        let outcome = Evaluation::Success {
            rendered: "\"<b>\"".into(),
        };
        let reply = format_reply("'<b>'", &outcome);
        assert!(!reply.contains("'<b>'"));
        assert!(reply.contains("&lt;b&gt;"));
    }
}
