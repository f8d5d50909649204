//! Composition of the study-note email sent to the recipient.

use crate::collaborators::OutgoingEmail;
use crate::utils::html_escape;

const STYLE: &str = "body { font-family: 'Microsoft YaHei', Arial, sans-serif; line-height: 1.6; \
color: #333; max-width: 800px; margin: 0 auto; padding: 20px; } \
.container { background-color: #f9f9f9; border-radius: 8px; padding: 25px; } \
.footer { font-size: 12px; color: #888; text-align: center; margin-top: 30px; \
padding-top: 15px; border-top: 1px solid #e0e0e0; } \
table { width: 100%; border-collapse: collapse; margin: 20px 0; } \
th, td { padding: 10px; border: 1px solid #ddd; text-align: left; }";

/// Subject line for a transcript title.
#[must_use]
pub fn digest_subject(title: &str) -> String {
    format!("【新闻联播学习笔记】{title}")
}

/// Builds the study-note email. `notes_html` is inserted as-is; the plain
/// text alternative carries the summary.
#[must_use]
pub fn compose_digest_email(title: &str, summary: &str, notes_html: &str) -> OutgoingEmail {
    let html_body = format!(
        "<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{escaped_title} - 学习笔记</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <div class=\"container\">\n{notes_html}\n\
         <div class=\"footer\">此邮件由AI自动生成，内容仅供参考学习使用。<br>\
         如需了解更多详情，请查看完整新闻内容。</div>\n\
         </div>\n</body>\n</html>\n",
        escaped_title = html_escape(title),
    );

    let text_body = format!("{title} - 学习笔记\n\n{summary}\n\n------\n此邮件由自动化系统发送，请勿回复。\n");

    OutgoingEmail {
        subject: digest_subject(title),
        html_body,
        text_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject() {
        assert_eq!(digest_subject("2025年02月28日新闻联播"), "【新闻联播学习笔记】2025年02月28日新闻联播");
    }

    #[test]
    fn test_bodies() {
        let email = compose_digest_email("标题", "摘要内容", "<h1>笔记</h1>");
        assert!(email.html_body.contains("<h1>笔记</h1>"));
        assert!(email.html_body.contains("<title>标题 - 学习笔记</title>"));
        assert!(email.html_body.contains("此邮件由AI自动生成"));
        assert!(email.text_body.starts_with("标题 - 学习笔记\n\n摘要内容"));
        assert!(email.text_body.contains("请勿回复"));
    }
}
