//! Specialised prompts built on [`LlmClient::chat`].
//!
//! They differ only in system prompt, input truncation and output budget.

use std::path::Path;

use crate::contract::{ChatMessage, ChatRequest, LlmClient};
use crate::error::LlmError;

pub const CHAT_MAX_TOKENS: u32 = 1024;
pub const COMMAND_MAX_TOKENS: u32 = 256;
pub const WRITE_INPUT_CHARS: usize = 8_000;
pub const WRITE_MAX_TOKENS: u32 = 4096;
pub const REVIEW_INPUT_CHARS: usize = 12_000;
pub const REVIEW_MAX_TOKENS: u32 = 1024;
pub const SUMMARY_INPUT_CHARS: usize = 30_000;
pub const SUMMARY_MAX_TOKENS: u32 = 2048;

/// Prefix the shell-command prompt asks the model to use for refusals.
pub const COMMAND_REFUSAL_PREFIX: &str = "ERROR:";

const CHAT_SYSTEM: &str = "You are RepoAI, a helpful assistant for GitHub repos and software development.
Help developers understand codebases, write code, run commands, and manage files.
Be concise and technical. When a user wants to analyze a repo type: analyze owner/repo";

const WRITE_SYSTEM: &str = "You are an expert software engineer.
Reply with ONLY the raw file content, with no explanation, no markdown fences and no commentary.
Output exactly what should be written to disk.";

const REVIEW_SYSTEM: &str = "You are RepoAI, an expert code reviewer. Be concise. Use these sections:
**Purpose**: what this file does
**Key components**: important functions/classes
**Code quality**: issues or strengths
**Suggestions**: specific improvements";

const SUMMARY_SYSTEM: &str = "You are RepoAI. Summarize a codebase analysis clearly and concisely.";

/// Returns at most `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Free-form assistant chat for `/chat`.
pub async fn chat<L: LlmClient + ?Sized>(
    llm: &L,
    messages: Vec<ChatMessage>,
) -> Result<String, LlmError> {
    llm.chat(ChatRequest {
        system: Some(CHAT_SYSTEM.to_string()),
        messages,
        max_tokens: CHAT_MAX_TOKENS,
    })
    .await
}

/// Translates a plain-English request into one shell command.
///
/// The reply is trimmed; a refusal starts with [`COMMAND_REFUSAL_PREFIX`].
pub async fn shell_command<L: LlmClient + ?Sized>(
    llm: &L,
    prompt: &str,
    cwd: &Path,
) -> Result<String, LlmError> {
    let system = format!(
        "You are a Linux shell expert inside a GitHub Codespace.
Current directory: {}
The user will describe what they want in plain English.
Reply with ONLY the raw shell command, with no explanation, no markdown and no backticks.
If the request is dangerous or unclear, reply with: {COMMAND_REFUSAL_PREFIX} <reason>",
        cwd.display()
    );
    let reply = llm
        .chat(ChatRequest {
            system: Some(system),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: COMMAND_MAX_TOKENS,
        })
        .await?;
    Ok(reply.trim().to_string())
}

/// Asks for the full new content of `path`, given an instruction and the
/// current content if the file exists.
pub async fn write_file<L: LlmClient + ?Sized>(
    llm: &L,
    path: &Path,
    instruction: &str,
    existing: Option<&str>,
) -> Result<String, LlmError> {
    let context = match existing.filter(|c| !c.is_empty()) {
        Some(content) => format!(
            "\nExisting content:\n```\n{}\n```\n",
            truncate_chars(content, WRITE_INPUT_CHARS)
        ),
        None => String::new(),
    };
    let prompt = format!(
        "File: {}\n{context}\nInstruction: {instruction}",
        path.display()
    );
    llm.chat(ChatRequest {
        system: Some(WRITE_SYSTEM.to_string()),
        messages: vec![ChatMessage::user(prompt)],
        max_tokens: WRITE_MAX_TOKENS,
    })
    .await
}

/// Reviews a single file of a repository.
pub async fn review_file<L: LlmClient + ?Sized>(
    llm: &L,
    repo: &str,
    path: &str,
    content: &str,
) -> Result<String, LlmError> {
    let prompt = format!(
        "Repo: `{repo}`\nFile: `{path}`\n\n```\n{}\n```",
        truncate_chars(content, REVIEW_INPUT_CHARS)
    );
    llm.chat(ChatRequest {
        system: Some(REVIEW_SYSTEM.to_string()),
        messages: vec![ChatMessage::user(prompt)],
        max_tokens: REVIEW_MAX_TOKENS,
    })
    .await
}

/// Summarises the per-file analyses of one session.
pub async fn summarize<L: LlmClient + ?Sized>(
    llm: &L,
    repo: &str,
    analyses: &[crate::pipeline::FileAnalysis],
) -> Result<String, LlmError> {
    let combined = analyses
        .iter()
        .map(|a| format!("### {}\n{}", a.path, a.analysis))
        .collect::<Vec<_>>()
        .join("\n\n");
    let prompt = format!(
        "Analyzed {} files from `{repo}`.

{}

Provide:
1. **Overall architecture**: what does this project do?
2. **Tech stack**: languages, frameworks, tools
3. **Strengths**: what the codebase does well
4. **Key issues**: most important problems
5. **Top 5 recommendations**: prioritized action items",
        analyses.len(),
        truncate_chars(&combined, SUMMARY_INPUT_CHARS)
    );
    llm.chat(ChatRequest {
        system: Some(SUMMARY_SYSTEM.to_string()),
        messages: vec![ChatMessage::user(prompt)],
        max_tokens: SUMMARY_MAX_TOKENS,
    })
    .await
}
