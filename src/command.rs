//! Turn-type classification.
//!
//! Maps the navigation SDK's turn-type names (e.g. `TURN_RIGHT_SHARP`,
//! `TAKE_SECOND_EXIT_ON_ROUNDABOUT`) to an icon id and a direction text.
//! Matching is substring-based on the uppercased name and the first
//! matching rule wins, so more specific names must precede names they
//! contain (`TURN_RIGHT_SHARP` before `TURN_RIGHT`).

use log::debug;

/// Icon and text shown for a turn-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
    pub icon_id: &'static str,
    pub text: &'static str,
}

/// A single classification rule.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub pattern: &'static str,
    pub direction: Direction,
}

pub const fn rule(pattern: &'static str, icon_id: &'static str, text: &'static str) -> Rule {
    Rule {
        pattern,
        direction: Direction { icon_id, text },
    }
}

/// Shown when no rule matches, and when there is no turn-type at all.
pub const KEEP_GOING_STRAIGHT: Direction = Direction {
    icon_id: "go_straight",
    text: "Keep going straight",
};

/// Built-in rules in priority order.
pub const DEFAULT_RULES: &[Rule] = &[
    rule("TURN_RIGHT_SHARP", "turn_right_sharp", "Turn sharp right"),
    rule("TURN_FAR_RIGHT", "turn_far_right", "Turn far right"),
    rule("TURN_SECOND_RIGHT", "turn_second_right", "Take the second right"),
    rule("TURN_THIRD_RIGHT", "turn_third_right", "Take the third right"),
    rule("TURN_RIGHT_AT_THE_END_OF_ROAD", "turn_right_at_the_end_of_road", "Turn right at the end of the road"),
    rule("TURN_RIGHT_ONTO_ACCOMODATION", "turn_right", "Turn right onto the access road"),
    rule("TURN_RIGHT", "turn_right", "Turn right"),
    rule("TURN_LEFT_SHARP", "turn_left_sharp", "Turn sharp left"),
    rule("TURN_FAR_LEFT", "turn_far_left", "Turn far left"),
    rule("TURN_SECOND_LEFT", "turn_second_left", "Take the second left"),
    rule("TURN_THIRD_LEFT", "turn_third_left", "Take the third left"),
    rule("TURN_LEFT_AT_THE_END_OF_ROAD", "turn_left_at_the_end_of_road", "Turn left at the end of the road"),
    rule("TURN_LEFT_ONTO_ACCOMODATION", "turn_left", "Turn left onto the access road"),
    rule("TURN_LEFT", "turn_left", "Turn left"),
    rule("TAKE_FIRST_EXIT_ON_ROUNDABOUT", "take_first_exit_on_roundabout", "Take the first exit at the roundabout"),
    rule("TAKE_SECOND_EXIT_ON_ROUNDABOUT", "take_second_exit_on_roundabout", "Take the second exit at the roundabout"),
    rule("TAKE_THIRD_EXIT_ON_ROUNDABOUT", "take_third_exit_on_roundabout", "Take the third exit at the roundabout"),
    rule("TAKE_FOURTH_EXIT_ON_ROUNDABOUT", "take_fourth_exit_on_roundabout", "Take the fourth exit at the roundabout"),
    rule("TAKE_FIFTH_EXIT_ON_ROUNDABOUT", "take_fifth_exit_on_roundabout", "Take the fifth exit at the roundabout"),
    rule("TAKE_SIXTH_EXIT_ON_ROUNDABOUT", "take_sixth_exit_on_roundabout", "Take the sixth exit at the roundabout"),
    rule("STAY_RIGHT", "stay_right", "Keep right"),
    rule("STAY_LEFT", "stay_left", "Keep left"),
    rule("CONTINUE_RIGHT", "continue_right", "Continue on the right lane"),
    rule("CONTINUE_LEFT", "continue_left", "Continue on the left lane"),
    rule("CONTINUE_MIDDLE", "continue_middle", "Continue on the middle lane"),
    rule("GO_STRAIGHT", "go_straight", "Go straight"),
    rule("UTURN", "uturn", "Make a U-turn"),
    rule("SERVICE_ROAD", "service_road", "Take the service road"),
    rule("UNDERPASS", "underpass", "Take the underpass"),
    rule("OVERPASS", "overpass", "Take the overpass"),
    rule("PEDESTRIAN_ROAD", "pedestrian_road", "Pedestrian road ahead"),
    rule("ABOUT_THE_ENTER_TUNNEL", "about_the_enter_tunnel", "Entering a tunnel"),
    rule("IN_TUNNEL", "in_tunnel", "In the tunnel"),
    rule("AFTER_TUNNEL", "after_tunnel", "Leaving the tunnel"),
    rule("EXCEEDED_THE_SPEED_LIMIT", "exceeded_the_speed_limit", "Speed limit exceeded"),
    rule("WILL_REACH_YOUR_DESTINATION", "will_reach_your_destination", "You will reach your destination"),
    rule("REACHED_YOUR_DESTINATION", "reached_your_destination", "You have reached your destination"),
];

/// Priority-ordered turn-type table.
#[derive(Debug, Clone)]
pub struct CommandTable {
    rules: Vec<Rule>,
    fallback: Direction,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec(), KEEP_GOING_STRAIGHT)
    }
}

impl CommandTable {
    pub fn new(rules: Vec<Rule>, fallback: Direction) -> Self {
        Self { rules, fallback }
    }

    /// Icon and text for `turn_type`; the fallback when nothing matches.
    pub fn classify(&self, turn_type: &str) -> Direction {
        let value = turn_type.to_uppercase();
        if value.is_empty() {
            return self.fallback;
        }
        match self.rules.iter().find(|r| value.contains(r.pattern)) {
            Some(r) => r.direction,
            None => {
                debug!("No direction for turn type {turn_type:?}");
                self.fallback
            }
        }
    }
}

/// True if `turn_type` announces arrival at (or approach to) the
/// destination, after which no further instruction is previewed.
pub fn is_arrival(turn_type: &str) -> bool {
    turn_type.to_uppercase().contains("DESTINATION")
}
