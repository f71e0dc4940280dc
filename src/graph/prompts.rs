//! Prompt templates for the research steps, and parsing of list replies.

use std::sync::OnceLock;

use regex::Regex;

use super::events::AnswerEvent;

/// Reply that accepts a reviewed blog post.
pub const APPROVAL: &str = "OKAY";

pub fn outline_prompt(query: &str) -> String {
    format!(
        "You are an expert at writing blog posts. You have been given a topic to write \
         a blog post about. Plan an outline for the blog post; it should be detailed and specific. \
         Another agent will formulate questions to find the facts necessary to fulfill the outline. \
         The topic is: {query}"
    )
}

pub fn questions_prompt(outline: &str, max_questions: usize) -> String {
    format!(
        "You are an expert at formulating research questions. You have been given an outline \
         for a blog post. Formulate a series of simple questions that will get you the facts necessary \
         to fulfill the outline. You cannot assume any existing knowledge; you must ask at least one \
         question for every bullet point in the outline. Avoid complex or multi-part questions; break \
         them down into a series of simple questions. Your output should be a list of questions, each \
         on a new line. Do not include headers or categories or any preamble or explanation; just a \
         list of questions. For speed of response, limit yourself to {max_questions} questions. \
         The outline is: {outline}"
    )
}

pub fn report_prompt(outline: &str, answers: &[AnswerEvent]) -> String {
    let mut prompt = format!(
        "You are an expert at writing blog posts. You are given an outline of a blog post \
         and a series of questions and answers that should provide all the data you need to write the \
         blog post. Compose the blog post according to the outline, using only the data given in the \
         answers. The outline is in <outline> and the questions and answers are in <questions> and \
         <answers>.\n<outline>{outline}</outline>"
    );
    for result in answers {
        prompt.push_str(&format!(
            "<question>{}</question>\n<answer>{}</answer>\n",
            result.question, result.answer
        ));
    }
    prompt
}

pub fn review_prompt(query: &str, report: &str, max_questions: usize) -> String {
    format!(
        "You are an expert reviewer of blog posts. You are given an original query, \
         and a blog post that was written to satisfy that query. Review the blog post and determine \
         if it adequately answers the query and contains enough detail. If it doesn't, come up with \
         a set of questions that will get you the facts necessary to expand the blog post. Another \
         agent will answer those questions. Your response should just be a list of questions, one \
         per line, without any preamble or explanation. For speed, generate a maximum of {max_questions} questions. \
         The original query is: '{query}'.\n\
         The blog post is: <blogpost>{report}</blogpost>.\n\
         If the blog post is fine, return just the string '{APPROVAL}'."
    )
}

fn list_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"^(?:[-*•]|\d{1,3}[.)]|\(\d{1,3}\))\s+").expect("list marker regex is valid")
    })
}

/// One question per non-blank line, list markers stripped, at most `cap`.
pub fn parse_questions(reply: &str, cap: usize) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .map(|line| list_marker().replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .take(cap)
        .collect()
}

/// True when the reviewer replied with the approval token alone.
pub fn is_approval(reply: &str) -> bool {
    reply
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"' || c == '.' || c == '`')
        .eq_ignore_ascii_case(APPROVAL)
}
