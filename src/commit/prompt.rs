//! Prompt construction for AI-generated commit messages.

use crate::commit::changes::ChangeSet;
use crate::config::{GenerationOptions, Language};

/// Conventional Commits type prefixes offered to the model.
pub const CONVENTIONAL_TYPES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore", "revert",
];

/// Maximum subject length requested from the model.
pub const MAX_SUBJECT_CHARS: usize = 72;

/// Build the prompt for generating a commit message from `changes`.
///
/// The instructions are rendered in the configured language; the change text
/// follows verbatim after a `Changes:` header.
pub fn build_commit_prompt(changes: &ChangeSet, options: &GenerationOptions) -> String {
    let instructions = match options.language {
        Language::Zh => zh_instructions(options),
        Language::En => en_instructions(options),
        Language::Ja => ja_instructions(options),
    };

    format!("{instructions}\n\nChanges:\n{}", changes.text())
}

fn type_list() -> String {
    CONVENTIONAL_TYPES.join(", ")
}

fn zh_instructions(options: &GenerationOptions) -> String {
    let mut lines = vec![
        "请基于下面的 Git 变更生成中文提交信息：".to_string(),
        "- 仅输出提交信息本身，不要解释、引号或 Markdown 代码块；".to_string(),
        format!(
            "- 第一行是简短主题（动词开头，不超过 {MAX_SUBJECT_CHARS} 个字符）；空一行；随后 1~3 行要点（每行以 \"- \" 开头，可省略）；"
        ),
    ];
    if options.conventional_commit {
        let mut line = format!(
            "- 使用 Conventional Commits 格式，主题以类型前缀开头（{}）；",
            type_list()
        );
        if let Some(commit_type) = &options.commit_type {
            line.push_str(&format!(" 主题类型固定为 \"{commit_type}\"；"));
        }
        lines.push(line);
    }
    lines.push(if options.use_emoji {
        "- 如适合，可在主题或要点中加入不超过 2 个表情符号；".to_string()
    } else {
        "- 不要加入任何表情符号；".to_string()
    });
    lines.push("- 不要包含模型自我描述或无关文本。".to_string());
    lines.join("\n")
}

fn en_instructions(options: &GenerationOptions) -> String {
    let mut lines = vec![
        "Generate an English commit message from the following Git changes.".to_string(),
        "- Output only the commit message: no quotes, no explanations, no Markdown code fences;"
            .to_string(),
        format!(
            "- Structure: one short subject line (imperative, at most {MAX_SUBJECT_CHARS} characters), then a blank line, then 1-3 bullet points (each starts with \"- \"; optional);"
        ),
    ];
    if options.conventional_commit {
        let mut line = format!(
            "- Use Conventional Commits: the subject starts with a type prefix ({});",
            type_list()
        );
        if let Some(commit_type) = &options.commit_type {
            line.push_str(&format!(" enforce type \"{commit_type}\";"));
        }
        lines.push(line);
    }
    lines.push(if options.use_emoji {
        "- If appropriate, include up to 2 emojis;".to_string()
    } else {
        "- Do not include emojis;".to_string()
    });
    lines.push("- Do not include model meta-commentary or unrelated text.".to_string());
    lines.join("\n")
}

fn ja_instructions(options: &GenerationOptions) -> String {
    let mut lines = vec![
        "以下の Git 変更内容に基づいて、日本語のコミットメッセージを生成してください。".to_string(),
        "- コミットメッセージのみを出力してください。説明、引用符、Markdown コードブロックは不要です；"
            .to_string(),
        format!(
            "- 1 行目は短い件名（動詞で始め、{MAX_SUBJECT_CHARS} 文字以内）、空行を挟み、1〜3 行の箇条書き（各行は \"- \" で始める、省略可）；"
        ),
    ];
    if options.conventional_commit {
        let mut line = format!(
            "- Conventional Commits 形式を使用し、件名は型プレフィックス（{}）で始めてください；",
            type_list()
        );
        if let Some(commit_type) = &options.commit_type {
            line.push_str(&format!(" コミットタイプは \"{commit_type}\" を使用してください；"));
        }
        lines.push(line);
    }
    lines.push(if options.use_emoji {
        "- 適切であれば、絵文字を 2 つまで含めてください；".to_string()
    } else {
        "- 絵文字は含めないでください；".to_string()
    });
    lines.push("- モデル自身の説明や無関係なテキストは含めないでください。".to_string());
    lines.join("\n")
}
