//! Server-rendered chat page.

use faramita_domain::DiceCheck;

use crate::stores::Exchange;

const STYLE: &str = "body{font-family:sans-serif;max-width:860px;margin:2em auto;padding:0 1em;background:#14110f;color:#e8e0d0}\
.turn{border-bottom:1px solid #3a322a;padding:.8em 0}\
.player{color:#c9a86a}\
.gm{margin-top:.4em;line-height:1.6}\
textarea{width:100%;min-height:4em;background:#1f1a16;color:#e8e0d0;border:1px solid #3a322a}\
.check{background:#2a2119;padding:.5em;margin:1em 0}\
.help{font-size:.9em;color:#a89a85}";

/// Escape text for HTML element and attribute content.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escaped text with newlines as `<br>`.
fn html_multiline(s: &str) -> String {
    html_escape(s).replace('\n', "<br>")
}

fn render_transcript(transcript: &[Exchange]) -> String {
    if transcript.is_empty() {
        return "<p class=\"help\">冒险尚未开始。</p>".to_string();
    }
    transcript
        .iter()
        .map(|exchange| {
            format!(
                "<div class=\"turn\"><div class=\"player\">&gt; {}</div><div class=\"gm\">{}</div></div>",
                html_multiline(&exchange.input),
                html_multiline(&exchange.reply)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_chat_page(
    world_name: &str,
    description: &str,
    transcript: &[Exchange],
    pending_check: Option<&DiceCheck>,
) -> String {
    let check_html = pending_check
        .map(|check| {
            format!(
                "<div class=\"check\">等待检定: {} (输入「掷骰」)</div>",
                html_escape(&check.announcement())
            )
        })
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\
<html lang=\"zh\"><head><meta charset=\"utf-8\"><title>{name}</title><style>{STYLE}</style></head>\
<body>\
<h1>{name}</h1>\
<p>{description}</p>\
<div id=\"transcript\">{transcript}</div>\
{check_html}\
<form method=\"post\" action=\"/\">\
  <textarea name=\"message\" placeholder=\"你要做什么？\" autofocus></textarea>\
  <button type=\"submit\">发送</button>\
</form>\
<form method=\"post\" action=\"/clear\"><button type=\"submit\">清空历史</button></form>\
<div class=\"help\">\
<p>🎲 掷骰: 在消息中写 <code>[[1d20+5]]</code>、<code>[[2d6]]</code> 或 <code>[[d8-1]]</code>。</p>\
<p>输入 <code>掷骰</code> 或 <code>roll</code> 快速投掷 1d20，或完成等待中的检定。</p>\
</div>\
</body></html>",
        name = html_escape(world_name),
        description = html_multiline(description),
        transcript = render_transcript(transcript),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape(r#"<b>"a" & 'b'</b>"#),
            "&lt;b&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn transcript_is_escaped_with_line_breaks() {
        let transcript = vec![Exchange {
            turn: 1,
            input: "<script>".to_string(),
            reply: "第一行\n第二行".to_string(),
        }];
        let html = render_chat_page("灰港", "雾", &transcript, None);
        assert!(html.contains("&gt; &lt;script&gt;"));
        assert!(html.contains("第一行<br>第二行"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("等待检定"));
    }

    #[test]
    fn shows_pending_check() {
        let check = DiceCheck {
            description: Some("攀爬".to_string()),
            attribute: None,
            dc: Some(12),
        };
        let html = render_chat_page("灰港", "", &[], Some(&check));
        assert!(html.contains("等待检定: [SYSTEM] [DICE] 攀爬"));
        assert!(html.contains("冒险尚未开始"));
    }
}
