use career_ai::recommendations::parse_recommendations;
use career_ai::repair::{parse_model_json, repair_truncated_json};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn sample_reply() -> String {
    let careers: Vec<_> = (1..=3)
        .map(|i| {
            json!({
                "id": i,
                "title": format!("Career {}", i),
                "match": 90 - i,
                "description": "A detailed description of the day-to-day work and outlook.",
                "salary": "6-25 LPA",
                "growth": "High",
                "skills": ["Communication", "Analysis", "Domain knowledge"],
                "companies": ["Infosys", "TCS", "Wipro"],
                "reasoning": "Matches stated interests and academic background.",
                "jobRoles": ["Analyst", "Associate", "Lead"]
            })
        })
        .collect();
    let colleges: Vec<_> = (1..=4)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("College {}", i),
                "location": "Bengaluru",
                "ranking": format!("NIRF #{}", i * 7),
                "fees": "2 L/yr",
                "cutoff": "Top 5%",
                "placement": "92%",
                "forCareers": ["Career 1", "Career 2"]
            })
        })
        .collect();
    let doc = json!({
        "careers": careers,
        "colleges": colleges,
        "entranceExams": [
            {"name": "JEE Main", "date": "January", "eligibility": "12th PCM", "forColleges": ["College 1"]}
        ]
    });
    format!(
        "```json\n{}\n```\nThese picks balance your interests and budget.",
        serde_json::to_string_pretty(&doc).unwrap()
    )
}

fn bench_repair(c: &mut Criterion) {
    let full = sample_reply();
    // Cut inside the colleges array, mid-string.
    let cut = full.find("College 3").unwrap_or(full.len() / 2) + 4;
    let truncated = full[..cut].to_string();

    c.bench_function("parse_model_json_complete", |b| {
        b.iter(|| parse_model_json(black_box(&full)).unwrap())
    });
    c.bench_function("parse_model_json_truncated", |b| {
        b.iter(|| parse_model_json(black_box(&truncated)).unwrap())
    });
    c.bench_function("repair_truncated_json_only", |b| {
        b.iter(|| repair_truncated_json(black_box(&truncated)))
    });
    c.bench_function("parse_recommendations_truncated", |b| {
        b.iter(|| parse_recommendations(black_box(&truncated)).unwrap())
    });
}

criterion_group!(benches, bench_repair);
criterion_main!(benches);
