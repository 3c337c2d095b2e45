pub mod test_fixture;

pub use test_fixture::TestFixture;
