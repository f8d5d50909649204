//! Fallback artifacts used when a generative stage fails.

use crate::classify::FailureCategory;
use crate::utils::{excerpt, html_escape};

/// Summary used when summarization fails.
pub const FALLBACK_SUMMARY: &str = "由于Gemini API不稳定，无法生成摘要。请稍后重试。";

/// Characters of transcript shown in the fallback notes.
pub const FALLBACK_EXCERPT_CHARS: usize = 500;

/// Notes used when note generation fails: the title, the failure, and the
/// start of the transcript. Every interpolated value is escaped.
#[must_use]
pub fn fallback_notes_html(
    title: &str,
    category: FailureCategory,
    message: &str,
    content: &str,
) -> String {
    format!(
        "<h1>{title}</h1>\n\
         <div style=\"background-color: #fff3cd; border: 1px solid #ffeaa7; padding: 15px; border-radius: 5px; margin: 20px 0;\">\n\
         <h3 style=\"color: #856404;\">笔记生成失败</h3>\n\
         <p>由于API错误（{label}），无法生成结构化笔记。错误信息：{message}</p>\n\
         <p>请查看以下原始内容：</p>\n\
         </div>\n\
         <pre style=\"background-color: #f8f9fa; padding: 15px; border-radius: 5px; white-space: pre-wrap;\">{head}...</pre>\n",
        title = html_escape(title),
        label = html_escape(category.label()),
        message = html_escape(message),
        head = html_escape(excerpt(content, FALLBACK_EXCERPT_CHARS)),
    )
}
