//! Caption rendering.
//!
//! Literal placeholder substitution, not a templating language. A single
//! left-to-right scan replaces each recognized `{token}` whose value is
//! known; everything else (unknown tokens, tokens with no value, stray
//! braces) passes through verbatim. Substituted values are never
//! rescanned, so rendering is non-recursive and order-independent.

/// Values available to one render call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptionContext<'a> {
    pub season: u32,
    pub episode: u32,
    pub total_episode: u32,
    pub quality: &'a str,
    pub user_id: i64,
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub channel_id: Option<i64>,
    pub channel_title: Option<&'a str>,
}

/// Render `template` against `ctx`.
pub fn render(template: &str, ctx: &CaptionContext<'_>) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];

        // A token is the shortest `{...}` span with no inner brace.
        match after[1..].find(['{', '}']) {
            Some(pos) if after.as_bytes()[1 + pos] == b'}' => {
                let token = &after[1..1 + pos];
                match lookup(token, ctx) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&after[..pos + 2]),
                }
                rest = &after[pos + 2..];
            }
            _ => {
                out.push('{');
                rest = &after[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn lookup(token: &str, ctx: &CaptionContext<'_>) -> Option<String> {
    match token {
        "season" => Some(format!("{:02}", ctx.season)),
        "episode" => Some(format!("{:02}", ctx.episode)),
        "total_episode" => Some(format!("{:02}", ctx.total_episode)),
        "quality" => Some(ctx.quality.to_string()),
        "id" => Some(ctx.user_id.to_string()),
        "username" => ctx.username.map(|u| format!("@{}", u)),
        "first" => ctx.first_name.map(str::to_string),
        "channel_id" => ctx.channel_id.map(|id| id.to_string()),
        "channel_title" => ctx.channel_title.map(str::to_string),
        _ => None,
    }
}
