//! Fixed sentence lists used by the binary and the tests. The first sentence
//! of each list is the reference.

pub const INTERNET: &[&str] = &[
    "How can I increase the speed of my internet connection while using a VPN?",
    "How can i increase speed of internet ?",
    "Why is my internet so slow?",
    "Where is London?",
];

pub const NEWSPAPER: &[&str] = &[
    "Obama speaks to the media in Illinois",
    "The President greets the press in Chicago",
    "The President speaks to the newspapers in Illinois",
    "The President speaks to the media in Washington",
    "Obama greets the press in Illinois",
    "The Queen of England writes a letter to Obama",
    "Boris Johnson wrote on twitter.",
];
