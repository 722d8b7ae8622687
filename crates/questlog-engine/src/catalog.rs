//! Built-in achievement catalog

use crate::achievements::{AchievementDef, Catalog, Need};
use questlog_core::{BranchId, Reward, Scope};

fn def(id: &str, label: &str, icon: &str, scope: Scope, need: Need) -> AchievementDef {
    AchievementDef {
        id: id.to_string(),
        label: label.to_string(),
        icon: icon.to_string(),
        tier: 1,
        scope,
        need,
        reward: None,
        perk: None,
    }
}

impl AchievementDef {
    pub fn tier(mut self, tier: u32) -> Self {
        self.tier = tier;
        self
    }

    pub fn reward(mut self, reward: Reward) -> Self {
        self.reward = Some(reward);
        self
    }

    pub fn perk(mut self, perk: &str) -> Self {
        self.perk = Some(perk.to_string());
        self
    }
}

impl Catalog {
    pub fn new(entries: Vec<AchievementDef>) -> Self {
        Self { entries }
    }

    pub fn standard() -> Self {
        use Scope::{Daily, Life, Weekly};

        let mut entries = vec![
            // ==== Life: completions ====
            def("first-steps", "First Steps", "footprints", Life, Need::DoneLifetime(1))
                .reward(Reward::global(10)),
            def("getting-going", "Getting Going", "sprout", Life, Need::DoneLifetime(10))
                .reward(Reward::global(25)),
            def("centurion", "Centurion", "shield", Life, Need::DoneLifetime(100))
                .tier(3)
                .reward(Reward::global(100))
                .perk("polymath"),
            def("busy-day", "Busy Day", "calendar", Life, Need::DoneToday(5)).tier(2),
            def("marathon-day", "Marathon Day", "runner", Life, Need::DoneToday(10)).tier(3),
            // ==== Life: time of day ====
            def("night-owl", "Night Owl", "owl", Life, Need::HourRange { start: 0, end: 4 })
                .perk("night-shift"),
            def("early-bird", "Early Bird", "sunrise", Life, Need::HourRange { start: 5, end: 7 }),
            // ==== Life: level ====
            def("level-5", "Seasoned", "star", Life, Need::LevelAtLeast(5)).tier(2),
            def("level-10", "Veteran", "crown", Life, Need::LevelAtLeast(10)).tier(3),
        ];

        for branch in BranchId::ALL {
            let name = branch.as_str();
            entries.push(
                def(
                    &format!("{name}-adept"),
                    &format!("{} Adept", title(name)),
                    name,
                    Life,
                    Need::BranchLifetime { branch, count: 10 },
                )
                .reward(Reward::default().with_branch(branch, 25)),
            );
            entries.push(
                def(
                    &format!("{name}-master"),
                    &format!("{} Master", title(name)),
                    name,
                    Life,
                    Need::BranchLifetime { branch, count: 50 },
                )
                .tier(3)
                .reward(Reward::default().with_branch(branch, 100)),
            );
        }

        entries.extend([
            // ==== Streaks ====
            def("streak-3", "Three in a Row", "flame", Life, Need::StreakLength(3)),
            def("streak-7", "Full Week", "flame", Life, Need::StreakLength(7))
                .tier(2)
                .reward(Reward::global(50)),
            def("streak-30", "Unbroken", "flame", Life, Need::StreakLength(30))
                .tier(3)
                .reward(Reward::global(200)),
            // ==== Daily ====
            def("daily-three", "Daily Three", "check", Daily, Need::DoneToday(3))
                .reward(Reward::global(5)),
            // ==== Weekly ====
            def("weekly-grind", "Weekly Grind", "gear", Weekly, Need::WeeklyGlobalXp(500))
                .reward(Reward::global(25)),
            def("weekly-branch", "Branching Out", "tree", Weekly, Need::WeeklyBranchXp(1000))
                .tier(2)
                .reward(Reward::global(50)),
            def("weekly-regular", "Regular", "repeat", Weekly, Need::DoneThisWeek(15))
                .reward(Reward::global(30)),
        ]);

        for branch in BranchId::ALL {
            let name = branch.as_str();
            entries.push(
                def(
                    &format!("combo-{name}"),
                    &format!("{} Combo", title(name)),
                    "bolt",
                    Daily,
                    Need::BranchCombo(branch),
                )
                .reward(Reward::default().with_branch(branch, 10)),
            );
        }

        Self { entries }
    }
}

fn title(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
