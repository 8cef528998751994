use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use models::user::Role;
use service::auth::domain::{LoginInput, RegisterInput};
use service::auth::repository::mock::MockAuthRepository;
use service::auth::service::{AuthConfig, AuthService};

fn bench_login(c: &mut Criterion) {
    let repo = Arc::new(MockAuthRepository::default());
    let svc = AuthService::new(
        repo.clone(),
        AuthConfig { jwt_secret: "secret".into(), token_ttl_hours: 1, password_algorithm: "argon2".into() },
    );

    // pre-create user outside of the benchmark using a tokio runtime
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _ = rt.block_on(svc.register(RegisterInput {
        username: "bench_user".into(),
        email: "bench@example.com".into(),
        password: "Benchmark1".into(),
        full_name: "Bench User".into(),
        phone_number: "9876543210".into(),
        address: "1 Bench Road".into(),
        pin_code: "560001".into(),
        role: Role::Customer,
        service: None,
        experience: None,
        description: None,
    }));

    c.bench_function("auth_login_verify", |b| {
        b.iter(|| {
            let session = rt
                .block_on(svc.login(LoginInput { login: "bench_user".into(), password: "Benchmark1".into() }))
                .unwrap();
            svc.verify_token(&session.token).unwrap();
        });
    });
}

criterion_group!(benches, bench_login);
criterion_main!(benches);
