// ABOUTME: Shortcode to glyph table for Slack emoji.
// ABOUTME: Covers the standard set most often seen in reactions and messages.

/// Look up the glyph for a shortcode (without colons).
///
/// Handles Slack's `name::skin-tone-N` form by appending the matching
/// Fitzpatrick modifier. Custom workspace emoji return `None`.
pub fn glyph(code: &str) -> Option<String> {
    let (base, tone) = match code.split_once("::") {
        Some((base, tone)) => (base, Some(skin_tone(tone)?)),
        None => (code, None),
    };
    let glyph = base_glyph(base)?;
    Some(match tone {
        Some(tone) => format!("{glyph}{tone}"),
        None => glyph.to_string(),
    })
}

fn skin_tone(tone: &str) -> Option<&'static str> {
    match tone {
        "skin-tone-2" => Some("\u{1F3FB}"),
        "skin-tone-3" => Some("\u{1F3FC}"),
        "skin-tone-4" => Some("\u{1F3FD}"),
        "skin-tone-5" => Some("\u{1F3FE}"),
        "skin-tone-6" => Some("\u{1F3FF}"),
        _ => None,
    }
}

fn base_glyph(code: &str) -> Option<&'static str> {
    let glyph = match code {
        "+1" | "thumbsup" => "👍",
        "-1" | "thumbsdown" => "👎",
        "100" => "💯",
        "clap" => "👏",
        "pray" => "🙏",
        "raised_hands" => "🙌",
        "wave" => "👋",
        "ok_hand" => "👌",
        "muscle" => "💪",
        "point_up" => "☝️",
        "point_right" => "👉",
        "eyes" => "👀",
        "smile" => "😄",
        "smiley" => "😃",
        "grinning" => "😀",
        "grin" => "😁",
        "joy" => "😂",
        "rolling_on_the_floor_laughing" => "🤣",
        "laughing" | "satisfied" => "😆",
        "sweat_smile" => "😅",
        "slightly_smiling_face" => "🙂",
        "upside_down_face" => "🙃",
        "wink" => "😉",
        "blush" => "😊",
        "innocent" => "😇",
        "heart_eyes" => "😍",
        "kissing_heart" => "😘",
        "thinking_face" => "🤔",
        "neutral_face" => "😐",
        "expressionless" => "😑",
        "unamused" => "😒",
        "face_with_rolling_eyes" => "🙄",
        "grimacing" => "😬",
        "relieved" => "😌",
        "pensive" => "😔",
        "sleeping" => "😴",
        "sunglasses" => "😎",
        "nerd_face" => "🤓",
        "confused" => "😕",
        "worried" => "😟",
        "slightly_frowning_face" => "🙁",
        "open_mouth" => "😮",
        "astonished" => "😲",
        "flushed" => "😳",
        "pleading_face" => "🥺",
        "cry" => "😢",
        "sob" => "😭",
        "scream" => "😱",
        "rage" => "😡",
        "skull" => "💀",
        "exploding_head" => "🤯",
        "partying_face" => "🥳",
        "hugging_face" => "🤗",
        "shrug" => "🤷",
        "facepalm" => "🤦",
        "saluting_face" => "🫡",
        "melting_face" => "🫠",
        "heart" => "❤️",
        "orange_heart" => "🧡",
        "yellow_heart" => "💛",
        "green_heart" => "💚",
        "blue_heart" => "💙",
        "purple_heart" => "💜",
        "broken_heart" => "💔",
        "sparkles" => "✨",
        "star" => "⭐",
        "fire" => "🔥",
        "boom" => "💥",
        "zap" => "⚡",
        "tada" => "🎉",
        "confetti_ball" => "🎊",
        "rocket" => "🚀",
        "trophy" => "🏆",
        "dart" => "🎯",
        "bulb" => "💡",
        "memo" => "📝",
        "pushpin" => "📌",
        "link" => "🔗",
        "lock" => "🔒",
        "key" => "🔑",
        "bug" => "🐛",
        "hammer_and_wrench" => "🛠️",
        "gear" => "⚙️",
        "package" => "📦",
        "calendar" => "📆",
        "hourglass" => "⌛",
        "alarm_clock" => "⏰",
        "coffee" => "☕",
        "beers" => "🍻",
        "pizza" => "🍕",
        "cake" => "🍰",
        "white_check_mark" => "✅",
        "heavy_check_mark" => "✔️",
        "ballot_box_with_check" => "☑️",
        "x" => "❌",
        "heavy_multiplication_x" => "✖️",
        "warning" => "⚠️",
        "no_entry" => "⛔",
        "rotating_light" => "🚨",
        "question" => "❓",
        "exclamation" => "❗",
        "heavy_plus_sign" => "➕",
        "arrow_right" => "➡️",
        "arrow_up" => "⬆️",
        "arrow_down" => "⬇️",
        "repeat" => "🔁",
        "speech_balloon" => "💬",
        "thread" => "🧵",
        "robot_face" => "🤖",
        "ghost" => "👻",
        "see_no_evil" => "🙈",
        "information_source" => "ℹ️",
        "large_green_circle" => "🟢",
        "large_yellow_circle" => "🟡",
        "red_circle" => "🔴",
        "white_circle" => "⚪",
        "sunny" => "☀️",
        "rainbow" => "🌈",
        "snowflake" => "❄️",
        "seedling" => "🌱",
        "money_with_wings" => "💸",
        "chart_with_upwards_trend" => "📈",
        "chart_with_downwards_trend" => "📉",
        _ => return None,
    };
    Some(glyph)
}
