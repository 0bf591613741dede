//! One-time starter catalog, written only when the skills table is empty.
//! Approved moderation decisions are the sole writer after that.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ontology::models::normalize_alias;

struct SeedSkill {
    name: &'static str,
    skill_type: &'static str,
    aliases: &'static [&'static str],
    resources: &'static [&'static str],
    /// Starting market mention baseline for obsolescence tracking.
    baseline: f64,
}

struct SeedRole {
    title: &'static str,
    description: &'static str,
    salary: (i64, i64),
    requirements: &'static [(&'static str, f64)],
}

const SKILLS: &[SeedSkill] = &[
    SeedSkill {
        name: "Python",
        skill_type: "technical",
        aliases: &["python3"],
        resources: &["https://docs.python.org/3/tutorial/"],
        baseline: 14.0,
    },
    SeedSkill {
        name: "JavaScript",
        skill_type: "technical",
        aliases: &["js", "ecmascript"],
        resources: &["https://developer.mozilla.org/en-US/docs/Web/JavaScript"],
        baseline: 12.0,
    },
    SeedSkill {
        name: "React",
        skill_type: "technical",
        aliases: &["reactjs", "react.js"],
        resources: &["https://react.dev/learn"],
        baseline: 10.0,
    },
    SeedSkill {
        name: "SQL",
        skill_type: "technical",
        aliases: &["structured query language"],
        resources: &["https://mode.com/sql-tutorial/"],
        baseline: 12.0,
    },
    SeedSkill {
        name: "Machine Learning",
        skill_type: "technical",
        aliases: &["ml"],
        resources: &["https://www.coursera.org/learn/machine-learning"],
        baseline: 9.0,
    },
    SeedSkill {
        name: "Data Analysis",
        skill_type: "technical",
        aliases: &["data analytics"],
        resources: &["https://www.kaggle.com/learn/pandas"],
        baseline: 9.0,
    },
    SeedSkill {
        name: "Statistics",
        skill_type: "technical",
        aliases: &["statistical analysis"],
        resources: &[],
        baseline: 7.0,
    },
    SeedSkill {
        name: "Docker",
        skill_type: "tool",
        aliases: &["containers"],
        resources: &["https://docs.docker.com/get-started/"],
        baseline: 10.0,
    },
    SeedSkill {
        name: "Kubernetes",
        skill_type: "tool",
        aliases: &["k8s"],
        resources: &["https://kubernetes.io/docs/tutorials/"],
        baseline: 8.0,
    },
    SeedSkill {
        name: "AWS",
        skill_type: "tool",
        aliases: &["amazon web services"],
        resources: &["https://aws.amazon.com/training/"],
        baseline: 11.0,
    },
    SeedSkill {
        name: "Git",
        skill_type: "tool",
        aliases: &["version control"],
        resources: &["https://git-scm.com/book/en/v2"],
        baseline: 11.0,
    },
    SeedSkill {
        name: "Linux",
        skill_type: "technical",
        aliases: &["unix"],
        resources: &[],
        baseline: 9.0,
    },
    SeedSkill {
        name: "Excel",
        skill_type: "tool",
        aliases: &["microsoft excel", "spreadsheets"],
        resources: &[],
        baseline: 8.0,
    },
    SeedSkill {
        name: "Communication",
        skill_type: "soft",
        aliases: &["communication skills"],
        resources: &[],
        baseline: 10.0,
    },
    SeedSkill {
        name: "Leadership",
        skill_type: "soft",
        aliases: &[],
        resources: &[],
        baseline: 7.0,
    },
    SeedSkill {
        name: "Problem Solving",
        skill_type: "soft",
        aliases: &["problem-solving"],
        resources: &[],
        baseline: 8.0,
    },
    // Legacy framework kept active so obsolescence review has a live target
    // once its market mentions dry up.
    SeedSkill {
        name: "Angular",
        skill_type: "technical",
        aliases: &["angularjs"],
        resources: &["https://angular.dev/tutorials"],
        baseline: 6.0,
    },
];

const ROLES: &[SeedRole] = &[
    SeedRole {
        title: "Data Scientist",
        description: "Analyzes data and builds predictive models to answer business questions.",
        salary: (95_000, 150_000),
        requirements: &[
            ("Machine Learning", 1.0),
            ("Python", 0.9),
            ("Statistics", 0.8),
            ("Data Analysis", 0.8),
            ("SQL", 0.6),
        ],
    },
    SeedRole {
        title: "Frontend Developer",
        description: "Builds and maintains user-facing web applications.",
        salary: (70_000, 120_000),
        requirements: &[
            ("JavaScript", 1.0),
            ("React", 0.9),
            ("Git", 0.5),
            ("Communication", 0.4),
        ],
    },
    SeedRole {
        title: "DevOps Engineer",
        description: "Owns deployment pipelines, infrastructure, and service reliability.",
        salary: (90_000, 140_000),
        requirements: &[
            ("AWS", 1.0),
            ("Docker", 0.9),
            ("Kubernetes", 0.8),
            ("Linux", 0.7),
            ("Git", 0.5),
        ],
    },
    SeedRole {
        title: "Data Analyst",
        description: "Turns raw data into reports and dashboards for decision makers.",
        salary: (60_000, 95_000),
        requirements: &[
            ("SQL", 1.0),
            ("Data Analysis", 0.9),
            ("Excel", 0.7),
            ("Statistics", 0.6),
            ("Communication", 0.5),
        ],
    },
];

/// Seeds the starter catalog if the store is empty. Idempotent: a populated
/// skills table short-circuits.
pub async fn seed_catalog(pool: &PgPool) -> Result<(), AppError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM skills")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    let mut ids: Vec<(String, Uuid)> = Vec::with_capacity(SKILLS.len());
    for seed in SKILLS {
        let id = Uuid::new_v4();
        let resources: Vec<String> = seed.resources.iter().map(|r| r.to_string()).collect();
        sqlx::query(
            "INSERT INTO skills (id, name, skill_type, learning_resources)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(seed.name)
        .bind(seed.skill_type)
        .bind(&resources)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO skill_aliases (alias, display, skill_id) VALUES ($1, $2, $3)")
            .bind(normalize_alias(seed.name))
            .bind(seed.name)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for alias in seed.aliases {
            sqlx::query("INSERT INTO skill_aliases (alias, display, skill_id) VALUES ($1, $2, $3)")
                .bind(normalize_alias(alias))
                .bind(*alias)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO skill_market_stats (skill_id, mention_frequency) VALUES ($1, $2)",
        )
        .bind(id)
        .bind(seed.baseline)
        .execute(&mut *tx)
        .await?;

        ids.push((normalize_alias(seed.name), id));
    }

    for seed in ROLES {
        let role_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO roles (id, title, description, salary_low, salary_high)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(role_id)
        .bind(seed.title)
        .bind(seed.description)
        .bind(seed.salary.0)
        .bind(seed.salary.1)
        .execute(&mut *tx)
        .await?;

        for (position, (skill_name, weight)) in seed.requirements.iter().enumerate() {
            let needle = normalize_alias(skill_name);
            let skill_id = ids
                .iter()
                .find(|(name, _)| *name == needle)
                .map(|(_, id)| *id)
                .ok_or_else(|| {
                    AppError::Validation(format!("Seed role references unknown skill '{skill_name}'"))
                })?;
            sqlx::query(
                "INSERT INTO role_requirements (role_id, skill_id, weight, position)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(role_id)
            .bind(skill_id)
            .bind(weight)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    info!(
        "Seeded starter catalog: {} skills, {} roles",
        SKILLS.len(),
        ROLES.len()
    );
    Ok(())
}
