//*** START FILE: src/parsing/story_parser.rs ***//
use regex::Regex;

use crate::error::{CoachError, CoachResult};
use crate::types::story::{Segment, Story, StoryId};

// One segment: hanzi, optionally followed by its pinyin in parentheses.
const SEGMENT_PATTERN: &str = r"([^\s()]+)(?:\(([^()]*)\))?";

/// Parses an annotated story:
///
/// ```text
/// # comments start with '#'
/// TITLE:: 公园里的早晨
/// LEVEL:: beginner
/// 今天(jīn tiān) 早上(zǎo shang) ， 我(wǒ) 在(zài) 公园(gōng yuán)
/// ```
pub fn parse_story_text(id: StoryId, content: &str) -> CoachResult<Story> {
    let segment_re = Regex::new(SEGMENT_PATTERN).map_err(|e| CoachError::Parse(e.to_string()))?;
    let mut story = Story { id, title: "Untitled".to_string(), ..Default::default() };

    for (line_no, line) in content.lines().enumerate() {
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() || line_trimmed.starts_with('#') {
            continue;
        }
        if let Some(title) = line_trimmed.strip_prefix("TITLE::") {
            story.title = title.trim().to_string();
            continue;
        }
        if let Some(level) = line_trimmed.strip_prefix("LEVEL::") {
            let level = level.trim();
            story.level = (!level.is_empty()).then(|| level.to_string());
            continue;
        }

        // Whatever the pattern skips over has to be whitespace, otherwise
        // there's a stray parenthesis somewhere.
        let mut last_end = 0;
        for caps in segment_re.captures_iter(line_trimmed) {
            let Some(whole) = caps.get(0) else { continue };
            check_gap(&line_trimmed[last_end..whole.start()], line_no)?;
            last_end = whole.end();

            let hanzi = caps.get(1).map_or("", |m| m.as_str());
            let pinyin = caps.get(2).map(|m| m.as_str().trim());
            story.segments.push(Segment::new(hanzi, pinyin));
        }
        check_gap(&line_trimmed[last_end..], line_no)?;
    }

    if story.segments.is_empty() {
        return Err(CoachError::Parse("No segments found in story text.".to_string()));
    }
    Ok(story)
}

fn check_gap(gap: &str, line_no: usize) -> CoachResult<()> {
    if gap.trim().is_empty() {
        Ok(())
    } else {
        Err(CoachError::Parse(format!(
            "Line {}: unexpected '{}' (unbalanced parentheses?)",
            line_no + 1,
            gap.trim()
        )))
    }
}

//*** END FILE: src/parsing/story_parser.rs ***//
