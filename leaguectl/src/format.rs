//! Plain-text rendering of league data for the terminal.

use std::collections::BTreeMap;
use std::fmt::Write;

use league::{
    GameOutcome, GameResult, IntegrityReport, LeagueConfig, LeagueSummary, OwnerKey, RankedTeam,
    Standing, Team,
};

const RULE_WIDTH: usize = 52;

/// `"3-1"`.
pub fn record(standing: &Standing) -> String {
    format!("{}-{}", standing.wins, standing.losses)
}

/// `"+12"`, `"-4"`, `"+0"`.
pub fn differential(standing: &Standing) -> String {
    format!("{:+}", standing.point_differential())
}

fn footer(config: &LeagueConfig) -> String {
    format!("Season {} - Week {}", config.season(), config.week())
}

pub fn teams(teams: &BTreeMap<OwnerKey, Team>) -> String {
    if teams.is_empty() {
        return "No teams registered yet.".to_string();
    }
    let mut out = String::new();
    let mut sorted: Vec<&Team> = teams.values().collect();
    sorted.sort_by(|a, b| a.abbreviation.cmp(&b.abbreviation));
    for team in sorted {
        let owner = team.owner_label.as_deref().unwrap_or(team.owner_id.as_str());
        let _ = writeln!(out, "{:<4} {:<28} owner: {}", team.abbreviation, team.name, owner);
    }
    let _ = write!(out, "Total teams: {}", teams.len());
    out
}

pub fn team(team: &Team, standing: Option<&Standing>) -> String {
    let standing = standing.copied().unwrap_or_default();
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", team.name, team.abbreviation);
    let _ = writeln!(
        out,
        "Owner:   {}",
        team.owner_label.as_deref().unwrap_or(team.owner_id.as_str())
    );
    let _ = writeln!(out, "Record:  {}", record(&standing));
    let _ = writeln!(out, "PF / PA: {} / {}", standing.points_for, standing.points_against);
    let _ = write!(out, "Diff:    {}", differential(&standing));
    out
}

/// Ranked table used by both `standings` and `rankings`.
pub fn table(title: &str, ranked: &[RankedTeam], config: &LeagueConfig) -> String {
    if ranked.is_empty() {
        return "No teams in the standings yet.".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(
        out,
        "{:<5}{:<20}{:<9}{:<6}{:<6}{:<6}",
        "#", "Team", "W-L", "PF", "PA", "Diff"
    );
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    for entry in ranked {
        let _ = writeln!(
            out,
            "{:<5}{:<20}{:<9}{:<6}{:<6}{:<6}",
            entry.rank,
            entry.team.abbreviation,
            record(&entry.standing),
            entry.standing.points_for,
            entry.standing.points_against,
            differential(&entry.standing),
        );
    }
    let _ = write!(out, "{} | {} teams", footer(config), ranked.len());
    out
}

pub fn game(game: &GameResult) -> String {
    format!(
        "Week {:<3} {} {} - {} {}",
        game.week, game.winner_team, game.winner_score, game.loser_score, game.loser_team
    )
}

pub fn games(games: &[GameResult]) -> String {
    if games.is_empty() {
        return "No games have been played yet.".to_string();
    }
    games.iter().map(game).collect::<Vec<_>>().join("\n")
}

pub fn outcome(outcome: &GameOutcome) -> String {
    let g = &outcome.game;
    format!(
        "{}\n{} now {} ({})\n{} now {} ({})",
        game(g),
        g.winner_abbr,
        record(&outcome.winner),
        differential(&outcome.winner),
        g.loser_abbr,
        record(&outcome.loser),
        differential(&outcome.loser),
    )
}

pub fn summary(summary: &LeagueSummary) -> String {
    format!(
        "{}\nSeason:       {}\nWeek:         {}\nTeams:        {}\nGames played: {}",
        summary.league_name, summary.season, summary.week, summary.teams, summary.games_played
    )
}

pub fn config(config: &LeagueConfig) -> String {
    config
        .iter()
        .map(|(key, value)| format!("{key} = {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn integrity(report: &IntegrityReport) -> String {
    if report.is_clean() {
        return "Teams, standings and head-to-head records are consistent.".to_string();
    }
    let mut out = String::from("Inconsistencies found:");
    for owner in &report.teams_without_standing {
        let _ = write!(out, "\n  team without standing: {owner}");
    }
    for owner in &report.standings_without_team {
        let _ = write!(out, "\n  standing without team: {owner}");
    }
    for key in &report.head_to_head_without_team {
        let _ = write!(out, "\n  head-to-head entry without team: {key}");
    }
    out
}
