//! Per-tick outputs: the city-wide recorder fields and per-agent /
//! per-neighborhood step rows.
//!
//! Field and column names are stable; downstream analysis keys on them.
//! Shares over an empty subgroup read -1.

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::aggregates::{CityAverages, SENTINEL};
use crate::agents::{Agent, Population};
use crate::geography::Neighborhood;
use crate::outlets::Outlets;
use crate::types::{
    AgeBand, Beverage, DrinkingStatus, Education, Gender, IncomeBand, Race, ResidenceBand,
};

// === CITY REPORT ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ReportField {
    pub name: String,
    pub value: f64,
}

/// Recorder fields for one tick, in a fixed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct CityReport {
    pub tick: u32,
    pub fields: Vec<ReportField>,
}

impl CityReport {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Share of `agents` satisfying `pred`; -1 when `agents` is empty.
fn share<'a>(agents: impl Iterator<Item = &'a Agent>, pred: impl Fn(&Agent) -> bool) -> f64 {
    let (n, k) = agents.fold((0usize, 0usize), |(n, k), a| (n + 1, k + pred(a) as usize));
    if n == 0 { SENTINEL } else { k as f64 / n as f64 }
}

struct Builder<'a> {
    agents: &'a Population,
    fields: Vec<ReportField>,
}

impl<'a> Builder<'a> {
    fn add(&mut self, name: impl Into<String>, value: f64) {
        self.fields.push(ReportField {
            name: name.into(),
            value,
        });
    }

    fn all(&mut self, name: impl Into<String>, pred: impl Fn(&Agent) -> bool) {
        let value = share(self.agents.iter(), pred);
        self.add(name, value);
    }

    fn within(
        &mut self,
        name: impl Into<String>,
        group: impl Fn(&Agent) -> bool,
        pred: impl Fn(&Agent) -> bool,
    ) {
        let value = share(self.agents.iter().filter(|a| group(a)), pred);
        self.add(name, value);
    }

    /// `{base}` overall plus race, gender, education, age and income
    /// subgroups: `pw{stem}`, `pm{stem}`, `plesshs{stem}`, `page1{stem}`, `pinc1{stem}`.
    fn with_subgroups(&mut self, stem: &str, pred: impl Fn(&Agent) -> bool + Copy) {
        self.all(format!("p{stem}"), pred);
        for race in Race::ALL {
            self.within(format!("p{}{stem}", race.prefix()), move |a| a.race == race, pred);
        }
        for (gender, tag) in [(Gender::Male, "m"), (Gender::Female, "f")] {
            self.within(format!("p{tag}{stem}"), move |a| a.gender == gender, pred);
        }
        for (education, tag) in Education::ALL.into_iter().zip(["lesshs", "hs", "morehs"]) {
            self.within(
                format!("p{tag}{stem}"),
                move |a| a.education == education,
                pred,
            );
        }
        for band in AgeBand::ALL {
            self.within(
                format!("page{}{stem}", band.index() + 1),
                move |a| a.age_band() == band,
                pred,
            );
        }
        for band in IncomeBand::ALL {
            self.within(
                format!("pinc{}{stem}", band.index() + 1),
                move |a| a.income_band() == band,
                pred,
            );
        }
    }

    /// Transition rate among counted agents whose last status was `from`.
    fn transition(
        &mut self,
        name: impl Into<String>,
        from: DrinkingStatus,
        to: DrinkingStatus,
        race: Option<Race>,
    ) {
        self.within(
            name,
            move |a| {
                !a.do_not_count && a.last_drinking == from && race.is_none_or(|r| a.race == r)
            },
            move |a| a.drinking == to,
        );
    }
}

/// Build the recorder fields from the current state.
pub fn city_report(
    tick: u32,
    agents: &Population,
    hoods: &[Neighborhood],
    city: &CityAverages,
) -> CityReport {
    let mut b = Builder {
        agents,
        fields: Vec::with_capacity(256),
    };

    // === Demographics ===
    b.add("numAgents", agents.len() as f64);
    let mean_age = if agents.is_empty() {
        SENTINEL
    } else {
        agents.iter().map(|a| a.age as f64).sum::<f64>() / agents.len() as f64
    };
    b.add("meanage", mean_age);
    b.all("pmale", |a| a.gender.is_male());
    for band in AgeBand::ALL {
        b.all(format!("page{}", band.index() + 1), move |a| a.age_band() == band);
    }
    for (race, name) in Race::ALL.into_iter().zip(["pwhite", "pblack", "phisp", "pother"]) {
        b.all(name, move |a| a.race == race);
    }
    for (education, name) in Education::ALL.into_iter().zip(["plesshs", "phs", "pmorehs"]) {
        b.all(name, move |a| a.education == education);
    }
    for band in IncomeBand::ALL {
        b.all(format!("pinc{}", band.index() + 1), move |a| a.income_band() == band);
    }
    for (i, band) in [
        ResidenceBand::UnderTwoYears,
        ResidenceBand::TwoToNineYears,
        ResidenceBand::TenYearsPlus,
    ]
    .into_iter()
    .enumerate()
    {
        b.all(format!("pdurres{}", i + 1), move |a| a.residence_band() == band);
    }
    b.all("pmoved", |a| a.moved);

    // === Mortality ===
    b.all("pdied", |a| a.died);
    for race in Race::ALL {
        b.within(format!("p{}died", race.prefix()), move |a| a.race == race, |a| a.died);
    }
    b.within("pmdied", |a| a.gender.is_male(), |a| a.died);
    b.within("pfdied", |a| !a.gender.is_male(), |a| a.died);
    for band in AgeBand::ALL {
        b.within(
            format!("page{}died", band.index() + 1),
            move |a| a.age_band() == band,
            |a| a.died,
        );
    }

    // === Drinking ===
    b.all("pnondrk", |a| a.drinking == DrinkingStatus::NonDrinker);
    for race in Race::ALL {
        b.within(
            format!("p{}nondrk", race.prefix()),
            move |a| a.race == race,
            |a| a.drinking == DrinkingStatus::NonDrinker,
        );
    }
    b.with_subgroups("light", |a| a.drinking == DrinkingStatus::Light);
    b.with_subgroups("heavy", |a| a.drinking == DrinkingStatus::Heavy);

    for (beverage, stem) in Beverage::ALL.into_iter().zip(["beer", "wine", "spirit"]) {
        b.all(format!("any{stem}"), move |a| a.beverages.drinks(beverage));
        for race in Race::ALL {
            b.within(
                format!("{}any{stem}", race.prefix()),
                move |a| a.race == race,
                move |a| a.beverages.drinks(beverage),
            );
        }
        b.within(
            format!("many{stem}"),
            |a| a.gender.is_male(),
            move |a| a.beverages.drinks(beverage),
        );
        b.within(
            format!("fany{stem}"),
            |a| !a.gender.is_male(),
            move |a| a.beverages.drinks(beverage),
        );
    }
    for (beverage, stem) in Beverage::ALL.into_iter().zip(["beer", "wine", "spirit"]) {
        b.all(format!("prefer{stem}"), move |a| a.beverages.prefers(beverage));
    }

    // Persistence of the baseline status
    for (baseline, stem) in DrinkingStatus::ALL
        .into_iter()
        .zip(["nondrk", "lightdrk", "heavydrk"])
    {
        for now in DrinkingStatus::ALL {
            b.within(
                format!("p{stem}{}", now.code()),
                move |a| a.baseline_drinking == baseline,
                move |a| a.drinking == now,
            );
        }
    }

    // Annual transition rates, recycled agents excluded
    use DrinkingStatus::{Heavy, Light, NonDrinker};
    let transitions = [
        ("non2light", NonDrinker, Light),
        ("non2non", NonDrinker, NonDrinker),
        ("light2non", Light, NonDrinker),
        ("light2light", Light, Light),
        ("light2heavy", Light, Heavy),
        ("heavy2light", Heavy, Light),
        ("heavy2heavy", Heavy, Heavy),
    ];
    for (stem, from, to) in transitions {
        b.transition(format!("p{stem}"), from, to, None);
    }
    for race in [Race::White, Race::Black] {
        for (stem, from, to) in transitions {
            b.transition(format!("p{}{stem}", race.prefix()), from, to, Some(race));
        }
    }

    // === Violence ===
    b.all("ppotviolvict", |a| a.violence.potential_victim);
    b.all("pviolvict", |a| a.violence.victim);
    b.all("palcviol", |a| a.violence.alcohol_violence);
    b.all("peverviolvict", |a| a.violence.prior_victim);
    b.all("ppotviolperp", |a| a.violence.potential_perp);
    b.all("pviolperp", |a| a.violence.perp);
    b.all("peverviolperp", |a| a.violence.prior_perp);
    b.all("phom", |a| a.violence.homicide);
    b.all("palchom", |a| a.violence.alcohol_homicide);
    for race in [Race::White, Race::Black, Race::Hispanic] {
        let p = race.prefix();
        b.within(format!("p{p}violvict"), move |a| a.race == race, |a| a.violence.victim);
        b.within(format!("p{p}violperp"), move |a| a.race == race, |a| a.violence.perp);
        b.within(format!("p{p}hom"), move |a| a.race == race, |a| a.violence.homicide);
    }
    b.all("pvioltarget", |a| {
        a.hood
            .and_then(|h| hoods.get(h.index()))
            .is_some_and(|h| h.targeted)
    });
    b.add(
        "numvioltarget",
        hoods.iter().filter(|h| h.targeted).count() as f64,
    );

    // === Income mobility ===
    use crate::agents::IncomeHoodClass::{High, Low};
    b.within("phigh2low", |a| a.base_income_hood == Some(High), |a| {
        a.ever_low_income_hood
    });
    b.within("plow2high", |a| a.base_income_hood == Some(Low), |a| {
        a.ever_high_income_hood
    });
    for race in [Race::White, Race::Black] {
        let p = race.prefix();
        b.within(
            format!("p{p}high2low"),
            move |a| a.race == race && a.base_income_hood == Some(High),
            |a| a.ever_low_income_hood,
        );
        b.within(
            format!("p{p}low2high"),
            move |a| a.race == race && a.base_income_hood == Some(Low),
            |a| a.ever_high_income_hood,
        );
    }

    // === Neighborhood averages ===
    b.add("avghoodinc", city.income);
    b.add("avghoodviol", city.violence);
    b.add("avgstable", city.stable);
    b.add("avghoodheavy", city.heavy);

    CityReport {
        tick,
        fields: b.fields,
    }
}

/// Share of agents matching `pred` as a percentage; 0 for populations of
/// one agent or fewer.
pub fn percent(agents: &Population, pred: impl Fn(&Agent) -> bool) -> f64 {
    if agents.len() <= 1 {
        return 0.0;
    }
    100.0 * agents.iter().filter(|a| pred(a)).count() as f64 / agents.len() as f64
}

// === STEP ROWS ===

fn bit(b: bool) -> u8 {
    b as u8
}

/// One agent at the end of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct AgentStepRow {
    pub tick: u32,
    #[serde(rename = "agentID")]
    pub agent_id: u32,
    #[serde(rename = "agentX")]
    pub agent_x: u32,
    #[serde(rename = "agentY")]
    pub agent_y: u32,
    /// -1 when unplaced
    #[serde(rename = "agentHood")]
    pub agent_hood: i64,
    pub age: u32,
    pub age2: u8,
    pub age3: u8,
    pub age4: u8,
    pub age5: u8,
    pub age6: u8,
    /// 1 male, 0 female
    pub gender: u8,
    /// 1 white, 2 black, 3 hispanic, 4 other
    pub race: u8,
    pub black: u8,
    pub hisp: u8,
    pub otherrace: u8,
    /// 1 <HS, 2 HS, 3 >HS
    pub education: u8,
    pub hs: u8,
    pub morehs: u8,
    /// Income category (1–16) at creation
    pub baseincome: u8,
    /// Income band (1–4)
    pub houseincome: u8,
    pub inc2: u8,
    pub inc3: u8,
    pub inc4: u8,
    pub died: u8,
    pub pviolvict: f64,
    pub potviolvict: u8,
    pub violvict: u8,
    pub lastviolvict: u8,
    pub priorviolvict: u8,
    pub pviolperp: f64,
    pub potviolperp: u8,
    pub violperp: u8,
    pub lastviolperp: u8,
    pub priorviolperp: u8,
    pub probnondrk: f64,
    pub problightdrk: f64,
    pub probheavydrk: f64,
    pub lastdrinkstat: u8,
    pub drinkstat: u8,
    pub nondrk: u8,
    pub lightdrk: u8,
    pub heavydrk: u8,
    pub alcviol: u8,
    pub probhom: f64,
    pub homicide: u8,
    pub alchom: u8,
    pub probmove: f64,
    pub moved: u8,
    pub duration: u32,
    pub dur1: u8,
    pub dur2: u8,
    pub dur3: u8,
    pub everhighinc: u8,
    pub everlowinc: u8,
    /// 1 high, 2 low, 0 unassigned
    pub baseinchood: u8,
    pub assignfrd: u32,
    pub numfrd: u32,
    pub nodrkfrd: u32,
    pub moddrkfrd: u32,
    pub heavydrkfrd: u32,
    /// Space-separated friend ids
    pub friendids: String,
    pub closeearly: u8,
}

pub fn agent_row(tick: u32, agent: &Agent, outlets: &Outlets) -> AgentStepRow {
    let age = agent.age_band();
    let income = agent.income_band();
    let residence = agent.residence_band();
    let v = &agent.violence;
    AgentStepRow {
        tick,
        agent_id: agent.id.0,
        agent_x: agent.x,
        agent_y: agent.y,
        agent_hood: agent.hood.map_or(-1, |h| h.0 as i64),
        age: agent.age,
        age2: bit(age == AgeBand::From25To34),
        age3: bit(age == AgeBand::From35To44),
        age4: bit(age == AgeBand::From45To54),
        age5: bit(age == AgeBand::From55To64),
        age6: bit(age == AgeBand::Over65),
        gender: bit(agent.gender.is_male()),
        race: agent.race.index() as u8 + 1,
        black: bit(agent.race == Race::Black),
        hisp: bit(agent.race == Race::Hispanic),
        otherrace: bit(agent.race == Race::Other),
        education: agent.education.index() as u8 + 1,
        hs: bit(agent.education == Education::HighSchool),
        morehs: bit(agent.education == Education::MoreThanHighSchool),
        baseincome: agent.base_income.get(),
        houseincome: income.index() as u8 + 1,
        inc2: bit(income == IncomeBand::From25To50k),
        inc3: bit(income == IncomeBand::From50To100k),
        inc4: bit(income == IncomeBand::Over100k),
        died: bit(agent.died),
        pviolvict: v.p_victim,
        potviolvict: bit(v.potential_victim),
        violvict: bit(v.victim),
        lastviolvict: bit(v.last_victim),
        priorviolvict: bit(v.prior_victim),
        pviolperp: v.p_perp,
        potviolperp: bit(v.potential_perp),
        violperp: bit(v.perp),
        lastviolperp: bit(v.last_perp),
        priorviolperp: bit(v.prior_perp),
        probnondrk: agent.drink_probs.non,
        problightdrk: agent.drink_probs.light,
        probheavydrk: agent.drink_probs.heavy,
        lastdrinkstat: agent.last_drinking.code(),
        drinkstat: agent.drinking.code(),
        nondrk: bit(agent.drinking == DrinkingStatus::NonDrinker),
        lightdrk: bit(agent.drinking == DrinkingStatus::Light),
        heavydrk: bit(agent.drinking == DrinkingStatus::Heavy),
        alcviol: bit(v.alcohol_violence),
        probhom: v.p_homicide,
        homicide: bit(v.homicide),
        alchom: bit(v.alcohol_homicide),
        probmove: agent.p_move,
        moved: bit(agent.moved),
        duration: agent.residence_duration,
        dur1: bit(residence == ResidenceBand::UnderTwoYears),
        dur2: bit(residence == ResidenceBand::TwoToNineYears),
        dur3: bit(residence == ResidenceBand::TenYearsPlus),
        everhighinc: bit(agent.ever_high_income_hood),
        everlowinc: bit(agent.ever_low_income_hood),
        baseinchood: agent.base_income_hood.map_or(0, |c| c.code()),
        assignfrd: agent.friend_target,
        numfrd: agent.friends.len() as u32,
        nodrkfrd: agent.friend_counts.non,
        moddrkfrd: agent.friend_counts.light,
        heavydrkfrd: agent.friend_counts.heavy,
        friendids: agent
            .friends
            .iter()
            .map(|f| f.0.to_string())
            .collect::<Vec<_>>()
            .join(" "),
        closeearly: bit(outlets.closes_early(agent)),
    }
}

/// One neighborhood at the end of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct HoodStepRow {
    pub tick: u32,
    #[serde(rename = "hoodID")]
    pub hood_id: u32,
    pub cdcode: u16,
    pub avghoodinc: f64,
    pub lastavghoodinc: f64,
    pub changeinc: f64,
    /// Income tercile 1–3, -1 when empty
    pub hoodinc: i32,
    pub hoodinc1: u8,
    pub hoodinc2: u8,
    pub highhoodinc: u8,
    pub avghoodviol: f64,
    pub lastavghoodviol: f64,
    pub changeviol: f64,
    pub highhoodviol: u8,
    pub avghoodperp: f64,
    pub targethood: u8,
    pub pblack: f64,
    pub phisp: f64,
    pub pstable: f64,
    pub police: u8,
    pub plight: f64,
    pub pheavy: f64,
    pub avgage: f64,
    pub phom: f64,
    pub palchom: f64,
    pub nagent: u32,
    pub ncell: u32,
    pub numviolevent: u32,
}

pub fn hood_row(tick: u32, hood: &Neighborhood) -> HoodStepRow {
    let (inc1, inc2) = hood.income_dummies();
    HoodStepRow {
        tick,
        hood_id: hood.id.0,
        cdcode: hood.census.cd_code,
        avghoodinc: hood.mean_income.current,
        lastavghoodinc: hood.mean_income.previous,
        changeinc: hood.mean_income.change(),
        hoodinc: hood.income_tier.map_or(-1, |t| t.code()),
        hoodinc1: inc1 as u8,
        hoodinc2: inc2 as u8,
        highhoodinc: bit(hood.high_income),
        avghoodviol: hood.violence_rate.current,
        lastavghoodviol: hood.violence_rate.previous,
        changeviol: hood.violence_rate.change(),
        highhoodviol: bit(hood.high_violence),
        avghoodperp: hood.perp_rate,
        targethood: bit(hood.targeted),
        pblack: hood.pct_black,
        phisp: hood.pct_hisp,
        pstable: hood.pct_stable,
        police: bit(hood.policed),
        plight: hood.pct_light,
        pheavy: hood.pct_heavy,
        avgage: hood.mean_age,
        phom: hood.homicide_rate,
        palchom: hood.alc_homicide_rate,
        nagent: hood.residents() as u32,
        ncell: hood.num_cells as u32,
        numviolevent: hood.violent_events,
    }
}

// === SNAPSHOT ===

/// City report plus neighborhood rows, for rendering.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct StateSnapshot {
    pub tick: u32,
    pub report: CityReport,
    pub hoods: Vec<HoodStepRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Demographics;
    use crate::geography::{CensusTable, HoodRect};
    use crate::types::{AgentId, HoodId, IncomeCategory};

    fn make_agent(id: u32, race: Race, status: DrinkingStatus) -> Agent {
        let d = Demographics {
            age: 30,
            gender: Gender::Female,
            race,
            education: Education::MoreThanHighSchool,
            income: IncomeCategory::new(10),
        };
        let mut agent = Agent::new(AgentId::new(id), d, 5);
        agent.drinking = status;
        agent.last_drinking = status;
        agent
    }

    fn make_population() -> Population {
        let mut agents = Population::new();
        agents.insert(make_agent(0, Race::White, DrinkingStatus::Heavy));
        agents.insert(make_agent(1, Race::White, DrinkingStatus::Light));
        agents.insert(make_agent(2, Race::Black, DrinkingStatus::NonDrinker));
        agents.insert(make_agent(3, Race::Black, DrinkingStatus::NonDrinker));
        agents
    }

    fn averages() -> CityAverages {
        CityAverages {
            income: 50_000.0,
            violence: 0.01,
            stable: 0.5,
            heavy: 0.1,
        }
    }

    #[test]
    fn test_field_names_are_unique() {
        let report = city_report(3, &make_population(), &[], &averages());
        let mut names: Vec<&str> = report.names().collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
        for required in [
            "numAgents", "meanage", "pheavy", "pwheavy", "pbheavy", "page1heavy", "pinc4light",
            "pnon2light", "pbheavy2light", "plightdrk2", "phigh2low", "avghoodviol", "palchom",
        ] {
            assert!(report.get(required).is_some(), "missing {}", required);
        }
    }

    #[test]
    fn test_shares_and_sentinels() {
        let report = city_report(3, &make_population(), &[], &averages());
        assert_eq!(report.get("numAgents"), Some(4.0));
        assert_eq!(report.get("pheavy"), Some(0.25));
        assert_eq!(report.get("pwheavy"), Some(0.5));
        assert_eq!(report.get("pbnondrk"), Some(1.0));
        // Nobody is hispanic, male or young
        assert_eq!(report.get("phheavy"), Some(-1.0));
        assert_eq!(report.get("pmheavy"), Some(-1.0));
        assert_eq!(report.get("page1light"), Some(-1.0));
        assert_eq!(report.get("pmale"), Some(0.0));
        assert_eq!(report.get("avghoodinc"), Some(50_000.0));
    }

    #[test]
    fn test_recycled_agents_excluded_from_transitions() {
        let mut agents = make_population();
        if let Some(a) = agents.get_mut(AgentId::new(2)) {
            a.drinking = DrinkingStatus::Light;
            a.do_not_count = true;
        }
        let report = city_report(3, &agents, &[], &averages());
        assert_eq!(report.get("pnon2light"), Some(0.0));
        assert_eq!(report.get("pnon2non"), Some(1.0));
    }

    #[test]
    fn test_percent_getter_small_population() {
        let agents = make_population();
        assert_eq!(percent(&agents, |a| a.drinking == DrinkingStatus::Heavy), 25.0);

        let mut single = Population::new();
        single.insert(make_agent(0, Race::White, DrinkingStatus::Heavy));
        assert_eq!(percent(&single, |a| a.drinking == DrinkingStatus::Heavy), 0.0);
    }

    #[test]
    fn test_step_rows() {
        let mut agent = make_agent(9, Race::Black, DrinkingStatus::Heavy);
        agent.friends = vec![AgentId::new(1), AgentId::new(4)];
        agent.hood = Some(HoodId::new(3));
        let row = agent_row(7, &agent, &Outlets::default());
        assert_eq!(row.agent_hood, 3);
        assert_eq!((row.race, row.black, row.heavydrk, row.drinkstat), (2, 1, 1, 3));
        assert_eq!((row.houseincome, row.inc3), (3, 1));
        assert_eq!(row.friendids, "1 4");

        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("agentID").is_some());

        let census = CensusTable::nyc().records[0];
        let hood = Neighborhood::new(HoodId::new(0), HoodRect::new(60, 140, 78, 98), census);
        let row = hood_row(7, &hood);
        assert_eq!(row.cdcode, 101);
        assert_eq!(row.hoodinc, -1);
        assert_eq!(row.avghoodviol, -1.0);
        assert_eq!(row.nagent, 0);
    }
}
