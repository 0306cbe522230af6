//! build many benches
#[macro_use]
extern crate criterion;

use criterion::Criterion;
use jsbuild_compilers::testing::TestProject;

fn build_many_benchmark(c: &mut Criterion) {
    let project = TestProject::new().unwrap();
    for i in 0..20 {
        project
            .add_library_file(
                &format!("pkg{i}"),
                "main.go",
                &format!("package pkg{i}\n\nfunc F{i}() int {{\n\treturn {i}\n}}\n"),
            )
            .unwrap();
    }

    let mut group = c.benchmark_group("build many");
    group.sample_size(10);
    group.bench_function("sequential", |b| {
        b.iter(|| {
            let session = project.session().unwrap();
            for i in 0..20 {
                session.build_import_path(&format!("pkg{i}")).unwrap();
            }
        });
    });
}

criterion_group!(benches, build_many_benchmark);
criterion_main!(benches);
