mod common;

use rand::{distributions::Alphanumeric, Rng};
use rpcproxy::{proxy, service, FailureKind, Number, Value};

pub struct Shapes;

impl Shapes {
    fn describe_text(&self, s: String) -> String {
        format!("text:{s}")
    }

    fn describe_number(&self, n: Number) -> String {
        format!("number:{n}")
    }

    fn describe_any(&self, v: Value) -> String {
        format!("any:{}", v.runtime_type())
    }

    fn sum(&self, numbers: Vec<Number>) -> Number {
        let mut ints = 0i64;
        let mut floats = 0f64;
        let mut all_ints = true;
        for n in numbers {
            match n {
                Number::Int(i) => ints += i,
                Number::Float(x) => {
                    all_ints = false;
                    floats += x
                }
            }
        }
        if all_ints {
            Number::Int(ints)
        } else {
            Number::Float(ints as f64 + floats)
        }
    }

    fn first_word(&self, s: String) -> Option<String> {
        s.split_whitespace().next().map(str::to_owned)
    }

    fn repeat(&self, s: String, times: i32) -> Result<Vec<String>, String> {
        if times < 0 {
            return Err(format!("cannot repeat {times} times"));
        }
        Ok(vec![s; times as usize])
    }

    fn greet(&self, name: Option<String>) -> String {
        match name {
            Some(name) => format!("hello {name}"),
            None => "hello stranger".to_owned(),
        }
    }
}

service! {
    Shapes {
        fn describe_text as "describe"(s: String);
        fn describe_number as "describe"(n: Number);
        fn describe_any as "describe"(v: Value);
        fn sum(numbers: Vec<Number>);
        fn first_word(s: String);
        fn repeat(s: String, times: i32);
        fn greet(name: Option<String>);
    }
}

proxy! {
    pub struct ShapesClient {
        fn describe(v: Value) -> String;
        fn describe_int as "describe"(n: i64) -> String;
        fn sum(numbers: Vec<Number>) -> Number;
        fn sum_ints as "sum"(numbers: Vec<i64>) -> Number;
        fn first_word(s: String) -> Option<String>;
        fn repeat(s: String, times: i32) -> Vec<String>;
        fn repeat_wide as "repeat"(s: String, times: i64) -> Vec<String>;
        fn greet(name: Option<String>) -> String;
    }
}

#[tokio::test]
async fn overloads_resolve_on_runtime_argument_type() {
    let server = common::serve(Shapes).await;
    let client = server.factory.new_client::<ShapesClient>().unwrap();

    assert_eq!(client.describe("x").await.unwrap(), "text:x");
    assert_eq!(client.describe(Value::Int(3)).await.unwrap(), "number:3");
    assert_eq!(client.describe(Value::Float(0.5)).await.unwrap(), "number:0.5");
    assert_eq!(client.describe_int(7i64).await.unwrap(), "number:7");
    assert_eq!(client.describe(true).await.unwrap(), "any:Bool");
    assert_eq!(
        client
            .describe(Value::List(vec![Value::Nil]))
            .await
            .unwrap(),
        "any:List<Nil>"
    );

    server.stop().await;
}

#[tokio::test]
async fn lists_and_options() {
    let server = common::serve(Shapes).await;
    let client = server.factory.new_client::<ShapesClient>().unwrap();

    assert_eq!(client.sum_ints(vec![1i64, 2, 3]).await.unwrap(), 6i64);
    assert_eq!(
        client
            .sum(vec![Number::Int(1), Number::Float(0.5)])
            .await
            .unwrap(),
        Number::Float(1.5)
    );
    assert_eq!(client.sum(Vec::<Number>::new()).await.unwrap(), 0i64);

    assert_eq!(
        client.first_word("  two words").await.unwrap(),
        Some("two".to_owned())
    );
    assert_eq!(client.first_word("   ").await.unwrap(), None);

    assert_eq!(client.greet(None::<String>).await.unwrap(), "hello stranger");
    assert_eq!(
        client.greet(Some("ada".to_owned())).await.unwrap(),
        "hello ada"
    );

    assert_eq!(
        client.repeat("ab", 3i32).await.unwrap(),
        ["ab", "ab", "ab"]
    );
    let err = client.repeat("ab", -1i32).await.unwrap_err();
    assert_eq!(err.to_string(), "cannot repeat -1 times");
    assert_eq!(err.remote().unwrap().kind(), FailureKind::Invocation);

    // `times` is an i32 on the server; a wider count matches no overload.
    let err = client.repeat_wide("ab", i64::MAX).await.unwrap_err();
    assert_eq!(err.remote().unwrap().kind(), FailureKind::NoMatchingMethod);

    server.stop().await;
}

#[tokio::test]
async fn random_strings_round_trip() {
    let server = common::serve(Shapes).await;
    let client = server.factory.new_client::<ShapesClient>().unwrap();
    let direct = Shapes;
    let mut rng = rand::thread_rng();

    for _ in 0..20 {
        let len = rng.gen_range(0..64);
        let s: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        let times = rng.gen_range(0..5);

        assert_eq!(
            client.repeat(s.clone(), times).await.unwrap(),
            direct.repeat(s.clone(), times).unwrap()
        );
        assert_eq!(
            client.first_word(s.clone()).await.unwrap(),
            direct.first_word(s)
        );
    }

    server.stop().await;
}
