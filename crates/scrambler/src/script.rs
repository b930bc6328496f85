use std::fmt;

/// One user action in a headless export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// Press "next image".
    Next,
    /// Press "animate".
    Animate,
    /// Let refresh intervals elapse until the animation stops.
    Wait,
    /// Let exactly this many refresh intervals elapse.
    Frames(u32),
}

impl fmt::Display for ScriptStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptStep::Next => f.write_str("next"),
            ScriptStep::Animate => f.write_str("animate"),
            ScriptStep::Wait => f.write_str("wait"),
            ScriptStep::Frames(count) => write!(f, "frames:{count}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    steps: Vec<ScriptStep>,
}

impl Script {
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }
}

pub fn parse_script(value: &str) -> Result<Script, String> {
    let mut steps = Vec::new();
    for raw in value.split(',') {
        let token = raw.trim().to_ascii_lowercase();
        if token.is_empty() {
            continue;
        }
        let step = match token.split_once([':', '=']) {
            Some(("frames", count)) => {
                let count = count
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| format!("invalid frame count in '{token}'"))?;
                ScriptStep::Frames(count)
            }
            Some(_) => return Err(format!("unknown script step '{token}'")),
            None => match token.as_str() {
                "next" | "n" => ScriptStep::Next,
                "animate" | "a" => ScriptStep::Animate,
                "wait" | "w" => ScriptStep::Wait,
                other => {
                    return Err(format!(
                        "unknown script step '{other}'; expected next, animate, wait, or frames:N"
                    ))
                }
            },
        };
        steps.push(step);
    }
    if steps.is_empty() {
        return Err("script must contain at least one step".into());
    }
    Ok(Script { steps })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_steps() {
        let script = parse_script("next, animate,frames:12 ,WAIT").unwrap();
        assert_eq!(
            script.steps(),
            &[
                ScriptStep::Next,
                ScriptStep::Animate,
                ScriptStep::Frames(12),
                ScriptStep::Wait
            ]
        );
    }

    #[test]
    fn rejects_unknown_and_empty_scripts() {
        assert!(parse_script("jump").is_err());
        assert!(parse_script("frames:lots").is_err());
        assert!(parse_script("speed:2").is_err());
        assert!(parse_script(" , ").is_err());
    }

    #[test]
    fn display_round_trips_through_parser() {
        let text = "next,animate,wait,frames:3";
        let script = parse_script(text).unwrap();
        let rendered: Vec<String> = script.steps().iter().map(ToString::to_string).collect();
        assert_eq!(rendered.join(","), text);
    }
}
